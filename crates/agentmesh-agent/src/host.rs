//! AgentHost — an agent exposed as a callable capability
//!
//! Every loaded agent is both a callable (peers hold an `AgentClient`-style
//! handle) and a server (the agent runs an inbound capability server with
//! its two start tools). `AgentHost` composes the two around the
//! runner-facing [`Agent`].

use agentmesh_core::{Error, Result};
use agentmesh_jobs::{JobQueue, JobStore};
use agentmesh_rpc::{next_port, CapabilityClient, CapabilityServer, ToolSet};
use agentmesh_runner::Agent;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub struct AgentHost {
    agent: Arc<Agent>,
    strategy_name: String,
    client: Arc<CapabilityClient>,
    server: Mutex<Option<CapabilityServer>>,
    port: u16,
}

impl AgentHost {
    /// Bring the agent up as a capability server on the next free port and
    /// hand back the composed host.
    pub async fn start(
        agent: Arc<Agent>,
        strategy_name: impl Into<String>,
        store: Arc<JobStore>,
        queue: Arc<JobQueue>,
    ) -> Result<Self> {
        let strategy_name = strategy_name.into();
        let name = agent.name().to_string();

        let mut tools = ToolSet::new();
        register_start_tool(&mut tools, &agent, &strategy_name, &store, &queue);
        register_start_and_wait_tool(&mut tools, &agent, &strategy_name, &store, &queue);

        let port = next_port();
        let server = CapabilityServer::serve(format!("{}_server", name), port, tools).await?;
        let client = Arc::new(CapabilityClient::new(name.clone(), server.url()));

        info!(agent = %name, port = server.port(), strategy = %strategy_name, "agent hosted");

        Ok(Self {
            agent,
            strategy_name,
            client,
            port: server.port(),
            server: Mutex::new(Some(server)),
        })
    }

    pub fn name(&self) -> &str {
        self.agent.name()
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The handle peers hold to call this agent.
    pub fn client(&self) -> Arc<CapabilityClient> {
        self.client.clone()
    }

    /// Stop the inbound capability server. Idempotent.
    pub async fn shutdown(&self) {
        if let Some(server) = self.server.lock().await.take() {
            server.shutdown().await;
        }
    }
}

/// Render tool inputs the way they land in a job's initial text.
fn stringify_inputs(inputs: &Value) -> String {
    match inputs {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn register_start_tool(
    tools: &mut ToolSet,
    agent: &Arc<Agent>,
    strategy_name: &str,
    store: &Arc<JobStore>,
    queue: &Arc<JobQueue>,
) {
    let name = agent.name().to_string();
    let agent = agent.clone();
    let strategy = strategy_name.to_string();
    let store = store.clone();
    let queue = queue.clone();

    tools.register_fn(
        format!("start_agent_{}", name),
        format!("Starts the {} agent async. No wait for it's response.", name),
        move |inputs| {
            let agent = agent.clone();
            let strategy = strategy.clone();
            let store = store.clone();
            let queue = queue.clone();
            async move {
                let text = stringify_inputs(&inputs);
                let job_id = store.submit(&queue, agent, text, strategy, vec![]);
                Ok(Value::String(format!(
                    "Agent is running. Job started: {}",
                    job_id
                )))
            }
        },
    );
}

fn register_start_and_wait_tool(
    tools: &mut ToolSet,
    agent: &Arc<Agent>,
    strategy_name: &str,
    store: &Arc<JobStore>,
    queue: &Arc<JobQueue>,
) {
    let name = agent.name().to_string();
    let agent = agent.clone();
    let strategy = strategy_name.to_string();
    let store = store.clone();
    let queue = queue.clone();

    tools.register_fn(
        format!("_start_and_wait_{}", name),
        format!("Starts a new job for the agent {} and waits until it's finished.", name),
        move |inputs| {
            let agent = agent.clone();
            let strategy = strategy.clone();
            let store = store.clone();
            let queue = queue.clone();
            async move {
                let agent_inputs = inputs
                    .get("agent_inputs")
                    .map(stringify_inputs)
                    .ok_or_else(|| "missing 'agent_inputs'".to_string())?;
                let your_job_id = inputs
                    .get("your_job_id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing 'your_job_id'".to_string())?
                    .to_string();

                // The child exists in the store and queue before the caller
                // is suspended on it.
                let child_id = store.submit(&queue, agent, agent_inputs, strategy, vec![]);

                match store.suspend_on(&your_job_id, std::slice::from_ref(&child_id)) {
                    Ok(true) => queue.put(&your_job_id),
                    Ok(false) => {}
                    Err(Error::JobNotFound(_)) => {
                        return Ok(Value::String(format!(
                            "Job {} not found. You must provide your own job id to wait for another job.",
                            your_job_id
                        )));
                    }
                    Err(e) => return Err(e.to_string()),
                }

                Ok(Value::String(format!(
                    "Job {} has been started. To wait for it's completion return your plan.",
                    child_id
                )))
            }
        },
    );
}
