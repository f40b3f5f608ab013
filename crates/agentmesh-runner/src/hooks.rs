//! Run hooks — observation points inside a runner invocation

use tracing::info;

/// Callbacks a runner fires while driving one turn. Observation only; hooks
/// cannot alter the run.
pub trait RunHooks: Send + Sync {
    /// An assistant generation finished with the given text.
    fn on_generation_end(&self, agent: &str, content: &str) {
        let _ = (agent, content);
    }

    /// The model asked for a tool call.
    fn on_tool_start(&self, agent: &str, tool: &str) {
        let _ = (agent, tool);
    }
}

/// Default hooks: mirror generations and tool starts into the log.
pub struct LogHooks;

impl RunHooks for LogHooks {
    fn on_generation_end(&self, agent: &str, content: &str) {
        info!(agent, "[capture] assistant: {}", content);
    }

    fn on_tool_start(&self, agent: &str, tool: &str) {
        info!(agent, "[capture] tool started: {}", tool);
    }
}
