//! Process-global system tools server
//!
//! One shared capability server hosting the tools that operate on the
//! runtime itself rather than any single agent: job inspection, runtime
//! model swaps, and multi-job waiting.

use crate::registry::AgentRegistry;
use agentmesh_core::{Error, Result};
use agentmesh_jobs::{JobQueue, JobStore};
use agentmesh_rpc::{CapabilityServer, ToolSet};
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_SYSTEM_PORT: u16 = 22222;

/// The system server port, selected by `MAIN_MCP_PORT`.
pub fn system_server_port() -> u16 {
    std::env::var("MAIN_MCP_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SYSTEM_PORT)
}

fn job_not_found(job_id: &str) -> Value {
    Value::String(format!("Job with ID '{}' not found.", job_id))
}

fn require_str(inputs: &Value, key: &str) -> std::result::Result<String, String> {
    inputs
        .get(key)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| format!("missing '{}'", key))
}

/// Start the process-wide system server on the given port.
pub async fn start_system_server(
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    agents: Arc<AgentRegistry>,
    port: u16,
) -> Result<CapabilityServer> {
    let mut tools = ToolSet::new();

    {
        let store = store.clone();
        tools.register_fn(
            "get_job",
            "Get the status and summary of a specific job by its ID.",
            move |inputs| {
                let store = store.clone();
                async move {
                    let job_id = require_str(&inputs, "job_id")?;
                    let Some(job) = store.get(&job_id) else {
                        return Ok(job_not_found(&job_id));
                    };
                    let line = match job.summary.as_deref().filter(|s| !s.is_empty()) {
                        Some(summary) => {
                            format!("{}: {}. Summary: {}", job.job_id, job.status, summary)
                        }
                        None => format!("{}: {}", job.job_id, job.status),
                    };
                    Ok(Value::String(line))
                }
            },
        );
    }

    {
        let store = store.clone();
        tools.register_fn(
            "get_job_details",
            "Get every recorded detail of a specific job by its ID.",
            move |inputs| {
                let store = store.clone();
                async move {
                    let job_id = require_str(&inputs, "job_id")?;
                    let Some(job) = store.get(&job_id) else {
                        return Ok(job_not_found(&job_id));
                    };
                    let history = serde_json::to_value(&job.chat_history)
                        .map_err(|e| format!("history serialization failed: {}", e))?;
                    Ok(json!({
                        "job_id": job.job_id,
                        "agent": job.agent.name(),
                        "status": job.status,
                        "strategy_name": job.strategy_name,
                        "depends_on": job.depends_on,
                        "summary": job.summary,
                        "chat_history": history,
                    }))
                }
            },
        );
    }

    {
        let agents = agents.clone();
        tools.register_fn(
            "change_agent_model",
            "Changes the model of a specified agent at runtime.",
            move |inputs| {
                let agents = agents.clone();
                async move {
                    let agent_name = require_str(&inputs, "agent_name")
                        .map_err(|_| "Agent name not provided.".to_string())?;
                    let new_model = require_str(&inputs, "new_model")
                        .map_err(|_| "New model not provided.".to_string())?;
                    let host = agents
                        .get(&agent_name)
                        .ok_or_else(|| format!("Agent {} not found.", agent_name))?;
                    host.agent().set_model(&new_model).await;
                    Ok(Value::String(format!(
                        "Model of agent {} changed to {}.",
                        agent_name, new_model
                    )))
                }
            },
        );
    }

    {
        let store = store.clone();
        let queue = queue.clone();
        tools.register_fn(
            "wait_for_jobs",
            "Pauses the calling agent's job until a list of other jobs completes.",
            move |inputs| {
                let store = store.clone();
                let queue = queue.clone();
                async move {
                    let your_job_id = require_str(&inputs, "your_job_id")?;
                    let job_ids: Vec<String> = inputs
                        .get("job_ids_to_wait_for")
                        .and_then(|v| v.as_array())
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|v| v.as_str().map(String::from))
                                .collect()
                        })
                        .ok_or_else(|| "missing 'job_ids_to_wait_for'".to_string())?;

                    match store.suspend_on(&your_job_id, &job_ids) {
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
                        "Waiting for jobs: {}. To wait for their completion return your plan.",
                        job_ids.join(", ")
                    )))
                }
            },
        );
    }

    CapabilityServer::serve("agentmesh-system", port, tools).await
}
