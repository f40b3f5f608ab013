//! ScriptedRunner — deterministic runner for testing
//!
//! Each call to `run` pops the next scripted turn; an exhausted script
//! falls back to the default output. Inputs are recorded so tests can
//! assert on the exact messages the scheduler produced.

use crate::agent::Agent;
use crate::hooks::RunHooks;
use crate::runner::{AgentRunner, RunnerError, TurnResult};
use agentmesh_core::{ChatMessage, ToolCall};
use serde_json::Value;
use tokio::sync::Mutex;

/// One scripted runner behavior.
#[derive(Clone, Debug)]
pub enum ScriptedTurn {
    /// Return this value as the structured final output.
    Output(Value),
    /// Call a tool on one of the agent's capability clients, record the
    /// result in the transcript, then return `output`.
    CallToolThen {
        tool: String,
        arguments: Value,
        output: Value,
    },
    /// Fail the run with a request error.
    Fail(String),
}

pub struct ScriptedRunner {
    turns: Mutex<Vec<ScriptedTurn>>,
    default_output: Value,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedRunner {
    /// A runner with a sequence of behaviors, consumed in order.
    pub fn sequence(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns),
            default_output: serde_json::json!({ "response": "(script exhausted)", "plan": [] }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runner that always returns the same output.
    pub fn constant(output: Value) -> Self {
        Self {
            turns: Mutex::new(Vec::new()),
            default_output: output,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// The input list of every recorded call, in order.
    pub async fn call_inputs(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().await.clone()
    }

    async fn next_turn(&self) -> ScriptedTurn {
        let mut turns = self.turns.lock().await;
        if turns.is_empty() {
            ScriptedTurn::Output(self.default_output.clone())
        } else {
            turns.remove(0)
        }
    }
}

#[async_trait::async_trait]
impl AgentRunner for ScriptedRunner {
    async fn run(
        &self,
        agent: &Agent,
        input: Vec<ChatMessage>,
        hooks: &dyn RunHooks,
    ) -> Result<TurnResult, RunnerError> {
        self.calls.lock().await.push(input.clone());

        let mut history = input;
        let turn = self.next_turn().await;

        let output = match turn {
            ScriptedTurn::Fail(message) => return Err(RunnerError::Request(message)),

            ScriptedTurn::Output(output) => output,

            ScriptedTurn::CallToolThen {
                tool,
                arguments,
                output,
            } => {
                hooks.on_tool_start(agent.name(), &tool);
                let call_id = format!("call_{}", uuid::Uuid::new_v4().simple());
                history.push(ChatMessage::assistant_with_calls(
                    "",
                    vec![ToolCall {
                        id: call_id.clone(),
                        name: tool.clone(),
                        arguments: arguments.to_string(),
                    }],
                ));

                let result = dispatch(agent, &tool, arguments).await;
                history.push(ChatMessage::tool_result(call_id, result));
                output
            }
        };

        let rendered = output.to_string();
        hooks.on_generation_end(agent.name(), &rendered);
        history.push(ChatMessage::assistant(rendered));

        Ok(TurnResult {
            final_output: output,
            history,
        })
    }
}

/// Find the first capability client exposing `tool` and call it. Errors
/// come back as string payloads, the same way a live runner feeds transport
/// failures to the model.
async fn dispatch(agent: &Agent, tool: &str, arguments: Value) -> String {
    for client in agent.tools() {
        let listing = match client.list_tools().await {
            Ok(listing) => listing,
            Err(e) => return format!("Error: {}", e),
        };
        if listing.tools.iter().any(|t| t.name == tool) {
            return match client.call_tool(tool, arguments).await {
                Ok(value) => match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                Err(e) => format!("Error: {}", e),
            };
        }
    }
    format!("Error: no capability server exposes '{}'", tool)
}
