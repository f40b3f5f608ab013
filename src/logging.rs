//! Logging setup for the agentmesh binaries

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the process.
///
/// `RUST_LOG` wins when set; otherwise `-v` selects debug over info. With
/// `log_to_file` a per-run file under `logs/` receives everything the
/// console sees. The returned guard must stay alive until exit or tail
/// lines are lost.
pub fn init(verbose: bool, log_to_file: bool) -> Option<WorkerGuard> {
    let default_filter = if verbose {
        "agentmesh=debug,tower_http=info"
    } else {
        "agentmesh=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if log_to_file {
        let _ = std::fs::create_dir_all("logs");
        let filename = format!("run_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let appender = tracing_appender::rolling::never("logs", filename);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        None
    }
}
