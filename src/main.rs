//! Agentmesh — multi-agent orchestration runtime

use agentmesh::http::{serve_admin, AdminState, ADMIN_PORT};
use agentmesh::{logging, repl};
use agentmesh_agent::{
    load_agents, load_external_servers, start_system_server, system_server_port, topo_sort,
    AgentRegistry,
};
use agentmesh_core::discover_configs;
use agentmesh_jobs::{JobQueue, JobRuntime, JobStore, StrategyRegistry, WorkerOptions, WorkerPool};
use agentmesh_runner::{AgentRunner, OpenAiRunner};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "agentmesh", about = "Multi-agent orchestration runtime")]
struct Cli {
    /// Agent to target
    agent_name: Option<String>,

    /// If provided, runs autonomous mode; without it, an interactive chat
    agent_prompt: Option<String>,

    /// Redirect logs into a per-run file under logs/
    #[arg(long = "log")]
    log_to_file: bool,

    /// Enable verbose output (sets the log filter to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Directory of agent folders
    #[arg(long, default_value = "agents_config")]
    agents_dir: PathBuf,

    /// Directory of external capability-server descriptors
    #[arg(long, default_value = "capability_servers")]
    servers_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_to_file);

    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let runner: Arc<dyn AgentRunner> = Arc::new(OpenAiRunner::new(api_key));

    let store = Arc::new(JobStore::new());
    let queue = Arc::new(JobQueue::new());
    let strategies = Arc::new(StrategyRegistry::new());
    let agents = Arc::new(AgentRegistry::new());

    info!("starting system capability server");
    let system_server = start_system_server(
        store.clone(),
        queue.clone(),
        agents.clone(),
        system_server_port(),
    )
    .await?;

    info!("collecting external capability servers");
    let externals = load_external_servers(&cli.servers_dir)?;

    info!("discovering agents in {}", cli.agents_dir.display());
    let configs = discover_configs(&cli.agents_dir)?;
    let order = topo_sort(&configs)?;

    let runtime = Arc::new(JobRuntime {
        store: store.clone(),
        queue: queue.clone(),
        strategies,
        runner: runner.clone(),
    });
    let pool = WorkerPool::spawn(runtime, WorkerOptions::default());

    info!("loading agents");
    let loaded = load_agents(&configs, &order, &externals, store.clone(), queue.clone()).await?;
    for host in loaded.hosts() {
        agents.insert(host);
    }

    let outcome = run_mode(&cli, &agents, &store, &queue, runner).await;

    info!("shutting down");
    pool.shutdown().await;
    agents.shutdown_all().await;
    system_server.shutdown().await;

    outcome
}

async fn run_mode(
    cli: &Cli,
    agents: &Arc<AgentRegistry>,
    store: &Arc<JobStore>,
    queue: &Arc<JobQueue>,
    runner: Arc<dyn AgentRunner>,
) -> anyhow::Result<()> {
    match (&cli.agent_name, &cli.agent_prompt) {
        // Interactive chat with one agent.
        (Some(agent_name), None) => {
            let host = agents
                .get(agent_name)
                .ok_or_else(|| anyhow::anyhow!("unknown agent '{}'", agent_name))?;
            repl::user_chat(host.agent().clone(), runner).await
        }

        // Autonomous one-shot: submit the job and wait for the queue to drain.
        (Some(agent_name), Some(prompt)) => {
            let host = agents
                .get(agent_name)
                .ok_or_else(|| anyhow::anyhow!("unknown agent '{}'", agent_name))?;
            let job_id = store.submit(
                queue,
                host.agent().clone(),
                prompt.clone(),
                host.strategy_name(),
                vec![],
            );
            info!(job = %job_id, agent = %agent_name, "job submitted, waiting for the queue to drain");
            queue.join().await;
            info!(job = %job_id, "queued jobs completed");
            Ok(())
        }

        // Server mode: admin surface until ctrl-c.
        _ => {
            let state = Arc::new(AdminState {
                agents: agents.clone(),
                store: store.clone(),
                queue: queue.clone(),
            });
            let cancel = CancellationToken::new();
            let server = tokio::spawn(serve_admin(state, ADMIN_PORT, cancel.clone()));

            tokio::signal::ctrl_c().await?;
            info!("interrupt received");
            cancel.cancel();
            server.await??;
            Ok(())
        }
    }
}
