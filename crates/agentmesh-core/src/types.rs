//! Core types for Agentmesh

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a conversation transcript.
///
/// Scheduler-authored notes (e.g. "Job X has been started.") are injected
/// with [`Role::System`] so they are distinguishable from genuine agent
/// output. Strategies must tolerate such entries.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool call recorded on an assistant message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One step of the plan the built-in strategies expect on `final_output`.
///
/// Only `checked` drives termination decisions; the rest is carried for
/// diagnostics. Unknown step fields are dropped, missing ones default.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    #[serde(default)]
    pub step_name: String,
    #[serde(default)]
    pub plan_step: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub checked: bool,
}

/// Extract the `plan` array from a structured final output.
///
/// A missing or malformed plan is an empty plan — strategies answer that
/// with a corrective message rather than an error.
pub fn parse_plan(final_output: &Value) -> Vec<PlanStep> {
    match final_output.get("plan") {
        Some(Value::Array(steps)) => steps
            .iter()
            .filter_map(|s| serde_json::from_value(s.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract the optional `summary` field from a structured final output.
pub fn extract_summary(final_output: &Value) -> Option<String> {
    final_output
        .get("summary")
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Allocate a short job id — the trailing 6 hex chars of a v4 uuid.
pub fn short_job_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[id.len() - 6..].to_string()
}
