//! OpenAI-compatible chat-completions runner
//!
//! Drives one turn as a bounded tool loop: ask the model, dispatch any tool
//! calls to the agent's capability clients, feed results back, and stop at
//! the first response without tool calls. The final message must be a JSON
//! document matching the agent's output schema (enforced through the
//! `response_format` request field).

use crate::agent::Agent;
use crate::hooks::RunHooks;
use crate::runner::{AgentRunner, RunnerError, TurnResult};
use agentmesh_core::{ChatMessage, Role, ToolCall};
use agentmesh_rpc::CapabilityClient;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_TOOL_ROUNDS: usize = 25;

pub struct OpenAiRunner {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiRunner {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn complete(
        &self,
        agent: &Agent,
        history: &[ChatMessage],
        tools: &[ChatTool],
    ) -> Result<ChatChoiceMessage, RunnerError> {
        let mut messages = vec![WireMessage {
            role: "system".to_string(),
            content: Some(agent.instructions().to_string()),
            tool_calls: None,
            tool_call_id: None,
        }];
        messages.extend(history.iter().map(convert_message));

        let schema = agent.output_schema();
        let body = ChatRequest {
            model: agent.model().await,
            messages,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.to_vec())
            },
            response_format: ResponseFormat {
                kind: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema.name.clone(),
                    schema: schema.schema.clone(),
                },
            },
        };

        debug!(agent = %agent.name(), model = %body.model, "chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(agent = %agent.name(), %status, "chat completion failed: {}", error_text);
            return Err(RunnerError::Request(format!("{}: {}", status, error_text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RunnerError::MalformedOutput(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| RunnerError::MalformedOutput("response carried no choices".into()))
    }
}

#[async_trait::async_trait]
impl AgentRunner for OpenAiRunner {
    async fn run(
        &self,
        agent: &Agent,
        input: Vec<ChatMessage>,
        hooks: &dyn RunHooks,
    ) -> Result<TurnResult, RunnerError> {
        let (tools, dispatch) = collect_tools(agent).await;
        let mut history = input;

        for _round in 0..MAX_TOOL_ROUNDS {
            let message = self.complete(agent, &history, &tools).await?;

            let tool_calls = message.tool_calls.unwrap_or_default();
            if tool_calls.is_empty() {
                let content = message.content.unwrap_or_default();
                let final_output: Value = serde_json::from_str(&content)
                    .map_err(|e| RunnerError::MalformedOutput(format!("{}: {}", e, content)))?;
                hooks.on_generation_end(agent.name(), &content);
                history.push(ChatMessage::assistant(content));
                return Ok(TurnResult {
                    final_output,
                    history,
                });
            }

            history.push(ChatMessage::assistant_with_calls(
                message.content.unwrap_or_default(),
                tool_calls
                    .iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    })
                    .collect(),
            ));

            for tc in tool_calls {
                hooks.on_tool_start(agent.name(), &tc.function.name);
                let arguments: Value =
                    serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null);
                let result = match dispatch.get(&tc.function.name) {
                    Some(client) => match client.call_tool(&tc.function.name, arguments).await {
                        Ok(Value::String(s)) => s,
                        Ok(other) => other.to_string(),
                        // Transport failures go back to the model as text;
                        // the autonomous loop treats them as feedback.
                        Err(e) => format!("Error: {}", e),
                    },
                    None => format!("Error: no capability server exposes '{}'", tc.function.name),
                };
                history.push(ChatMessage::tool_result(tc.id, result));
            }
        }

        Err(RunnerError::ToolRoundLimit(MAX_TOOL_ROUNDS))
    }
}

/// Aggregate tool definitions across the agent's capability clients.
///
/// First registration wins on a name collision. A server that cannot be
/// listed is skipped with a warning; its tools simply stay invisible for
/// this turn.
async fn collect_tools(agent: &Agent) -> (Vec<ChatTool>, HashMap<String, Arc<CapabilityClient>>) {
    let mut tools = Vec::new();
    let mut dispatch: HashMap<String, Arc<CapabilityClient>> = HashMap::new();

    for client in agent.tools() {
        let listing = match client.list_tools().await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(server = %client.name(), "tool listing failed: {}", e);
                continue;
            }
        };
        for info in listing.tools {
            if dispatch.contains_key(&info.name) {
                continue;
            }
            dispatch.insert(info.name.clone(), client.clone());
            tools.push(ChatTool {
                kind: "function".to_string(),
                function: ChatFunction {
                    name: info.name,
                    description: info.description,
                    parameters: serde_json::json!({
                        "type": "object",
                        "additionalProperties": true
                    }),
                },
            });
        }
    }

    (tools, dispatch)
}

fn convert_message(message: &ChatMessage) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    WireMessage {
        role: role.to_string(),
        content: Some(message.content.clone()),
        tool_calls: message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect()
        }),
        tool_call_id: message.tool_call_id.clone(),
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: Value,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Clone, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: String,
    function: ChatFunction,
}

#[derive(Clone, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChoiceToolCall>>,
}

#[derive(Deserialize)]
struct ChoiceToolCall {
    id: String,
    function: ChoiceFunctionCall,
}

#[derive(Deserialize)]
struct ChoiceFunctionCall {
    name: String,
    arguments: String,
}
