//! Capability server — hosts a ToolSet over HTTP with SSE-framed responses

use crate::tool::ToolSet;
use agentmesh_core::{Result, ToolCallError, ToolCallRequest, ToolCallResult};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

struct ServerState {
    name: String,
    tools: Arc<ToolSet>,
}

/// A running capability server.
///
/// One instance per loaded agent (bound to a port from [`crate::next_port`])
/// plus one process-wide instance for system tools. Passing port 0 binds an
/// ephemeral port; `url()` always reports the real one.
pub struct CapabilityServer {
    name: String,
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CapabilityServer {
    /// Bind the listener and start serving the tool set in a background task.
    pub async fn serve(name: impl Into<String>, port: u16, tools: ToolSet) -> Result<Self> {
        let name = name.into();
        let state = Arc::new(ServerState {
            name: name.clone(),
            tools: Arc::new(tools),
        });

        let app = Router::new()
            .route("/healthz", get(health_handler))
            .route("/tools", get(tools_handler))
            .route("/rpc", post(rpc_handler))
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let server_name = name.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!(server = %server_name, "capability server exited: {}", e);
            }
        });

        info!(server = %name, %addr, "capability server listening");
        Ok(Self {
            name,
            addr,
            cancel,
            handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL peers use to reach this server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting calls and wait for the serve task to wind down.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
        info!(server = %self.name, "capability server stopped");
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "server": state.name, "status": "ok" }))
}

async fn tools_handler(State(state): State<Arc<ServerState>>) -> Json<agentmesh_core::ToolListing> {
    Json(state.tools.listing())
}

async fn rpc_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ToolCallRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    debug!(server = %state.name, tool = %request.tool, "rpc call");
    let tools = state.tools.clone();

    let stream = futures::stream::once(async move {
        let event = match tools.call(&request.tool, request.arguments).await {
            Ok(value) => Event::default()
                .event("result")
                .json_data(ToolCallResult { value }),
            Err(message) => Event::default()
                .event("error")
                .json_data(ToolCallError { message }),
        };
        // json_data only fails on unserializable payloads; report that as an
        // error frame rather than dropping the response.
        let event = event.unwrap_or_else(|e| {
            Event::default()
                .event("error")
                .data(format!("{{\"message\":\"response serialization failed: {}\"}}", e))
        });
        Ok(event)
    });

    Sse::new(stream)
}
