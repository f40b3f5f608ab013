//! Capability client — what peers hold to call a capability server

use agentmesh_core::{Error, Result, ToolCallError, ToolCallRequest, ToolCallResult, ToolListing};
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_RETRY_PAUSE: Duration = Duration::from_secs(2);
const DEFAULT_CONNECT_ATTEMPTS: usize = 3;

/// Client handle for one capability server.
///
/// Cheap to share behind an `Arc`; `connect` is idempotent so the chat loop
/// can re-assert connectivity before every run.
pub struct CapabilityClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
    connected: AtomicBool,
}

impl CapabilityClient {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            name: name.into(),
            base_url,
            http: reqwest::Client::new(),
            connected: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Probe the server's health endpoint until it answers, with bounded
    /// retries. A client that already connected returns immediately.
    pub async fn connect(&self) -> Result<()> {
        self.connect_with(DEFAULT_CONNECT_ATTEMPTS).await
    }

    pub async fn connect_with(&self, attempts: usize) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }

        let url = format!("{}/healthz", self.base_url);
        for attempt in 1..=attempts {
            let probe = tokio::time::timeout(CONNECT_TIMEOUT, self.http.get(&url).send()).await;
            match probe {
                Ok(Ok(response)) if response.status().is_success() => {
                    self.connected.store(true, Ordering::Release);
                    info!(server = %self.name, attempt, "capability client connected");
                    return Ok(());
                }
                Ok(Ok(response)) => {
                    warn!(server = %self.name, attempt, status = %response.status(), "health probe rejected");
                }
                Ok(Err(e)) => {
                    warn!(server = %self.name, attempt, "health probe failed: {}", e);
                }
                Err(_) => {
                    warn!(server = %self.name, attempt, "health probe timed out");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(CONNECT_RETRY_PAUSE).await;
            }
        }

        Err(Error::rpc(format!(
            "could not reach capability server '{}' at {} after {} attempts",
            self.name, self.base_url, attempts
        )))
    }

    /// Invoke a named tool and wait for the terminal SSE frame.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        debug!(server = %self.name, tool, "calling tool");
        let response = self
            .http
            .post(format!("{}/rpc", self.base_url))
            .json(&ToolCallRequest {
                tool: tool.to_string(),
                arguments,
            })
            .send()
            .await
            .map_err(|e| Error::rpc(format!("call to '{}' on {} failed: {}", tool, self.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::rpc(format!(
                "call to '{}' on {} returned {}: {}",
                tool, self.name, status, body
            )));
        }

        read_terminal_frame(response, &self.name, tool).await
    }

    /// Fetch the server's tool listing.
    pub async fn list_tools(&self) -> Result<ToolListing> {
        let listing = self
            .http
            .get(format!("{}/tools", self.base_url))
            .send()
            .await
            .map_err(|e| Error::rpc(format!("listing tools on {} failed: {}", self.name, e)))?
            .json::<ToolListing>()
            .await
            .map_err(|e| Error::rpc(format!("tool listing from {} malformed: {}", self.name, e)))?;
        Ok(listing)
    }
}

/// Scan the SSE body for the single terminal `result` or `error` event.
async fn read_terminal_frame(response: reqwest::Response, server: &str, tool: &str) -> Result<Value> {
    let mut bytes_stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = bytes_stream.next().await {
        let chunk = chunk.map_err(|e| Error::rpc(format!("stream from {} broke: {}", server, e)))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(event_end) = buffer.find("\n\n") {
            let event_str = buffer[..event_end].to_string();
            buffer = buffer[event_end + 2..].to_string();

            let mut event_type = String::new();
            let mut event_data = String::new();
            for line in event_str.lines() {
                if let Some(rest) = line.strip_prefix("event: ") {
                    event_type = rest.to_string();
                } else if let Some(rest) = line.strip_prefix("data: ") {
                    event_data = rest.to_string();
                }
            }

            match event_type.as_str() {
                "result" => {
                    let result: ToolCallResult = serde_json::from_str(&event_data)?;
                    return Ok(result.value);
                }
                "error" => {
                    let error: ToolCallError = serde_json::from_str(&event_data)
                        .unwrap_or(ToolCallError {
                            message: event_data.clone(),
                        });
                    return Err(Error::rpc(format!(
                        "tool '{}' on {} failed: {}",
                        tool, server, error.message
                    )));
                }
                _ => {}
            }
        }
    }

    Err(Error::rpc(format!(
        "stream from {} ended without a terminal frame for '{}'",
        server, tool
    )))
}
