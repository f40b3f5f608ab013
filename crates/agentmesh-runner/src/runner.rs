//! The AgentRunner seam

use crate::agent::Agent;
use crate::hooks::RunHooks;
use agentmesh_core::ChatMessage;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("tool round limit reached after {0} rounds")]
    ToolRoundLimit(usize),
}

/// What one turn of a runner produces.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The structured final output, shaped by the agent's output schema.
    pub final_output: Value,
    /// The full updated transcript: the input list plus everything the run
    /// appended (assistant turns, tool calls, tool results).
    pub history: Vec<ChatMessage>,
}

/// Drives one multi-step model turn for an agent.
///
/// Implementations own the model transport and the dispatch of tool calls
/// to the agent's capability clients. The scheduler never looks inside.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(
        &self,
        agent: &Agent,
        input: Vec<ChatMessage>,
        hooks: &dyn RunHooks,
    ) -> Result<TurnResult, RunnerError>;
}
