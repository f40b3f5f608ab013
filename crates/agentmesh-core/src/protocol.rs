//! Capability-server wire protocol — SSE-framed request/response
//!
//! Wire format:
//!
//! Caller → Server (HTTP POST /rpc):
//!   { "tool": "start_agent_Echo", "arguments": { "text": "hi" } }
//!
//! Server → Caller (SSE body, exactly one terminal event):
//!   event: result
//!   data: { "value": "Agent is running. Job started: a3f9b1" }
//!
//!   event: error
//!   data: { "message": "Tool not found: frobnicate" }
//!
//! Tool discovery (HTTP GET /tools):
//!   { "tools": [ { "name": "...", "description": "..." } ] }
//!
//! Liveness (HTTP GET /healthz):
//!   { "server": "<name>", "status": "ok" }

use serde::{Deserialize, Serialize};

/// A tool invocation sent to a capability server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Payload of a terminal `result` SSE event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub value: serde_json::Value,
}

/// Payload of a terminal `error` SSE event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallError {
    pub message: String,
}

/// One entry of a capability server's tool listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Response body of `GET /tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListing {
    pub tools: Vec<ToolInfo>,
}
