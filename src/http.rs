//! Admin HTTP surface
//!
//! A thin trigger endpoint next to the capability servers: POST a prompt to
//! an agent by name and the job is submitted fire-and-forget. Runs on
//! 127.0.0.1:9000 so the `agentmesh-run` client can reach it.

use agentmesh_agent::AgentRegistry;
use agentmesh_jobs::{JobQueue, JobStore};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub const ADMIN_PORT: u16 = 9000;

pub struct AdminState {
    pub agents: Arc<AgentRegistry>,
    pub store: Arc<JobStore>,
    pub queue: Arc<JobQueue>,
}

#[derive(Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub prompt: String,
}

pub fn admin_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/{agent_name}/run", post(run_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

/// Serve the admin surface until the token is cancelled.
pub async fn serve_admin(
    state: Arc<AdminState>,
    port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("admin surface listening on http://{}", addr);
    axum::serve(listener, admin_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Server is running" }))
}

async fn run_handler(
    Path(agent_name): Path<String>,
    State(state): State<Arc<AdminState>>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    info!(agent = %agent_name, "run request: {}", request.prompt);

    let Some(host) = state.agents.get(&agent_name) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "detail": format!("Unknown agent {}", agent_name) })),
        );
    };

    // Fire-and-forget: the job id is on the queue, the caller gets an ack.
    state.store.submit(
        &state.queue,
        host.agent().clone(),
        request.prompt,
        host.strategy_name(),
        vec![],
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "started", "agent": agent_name })),
    )
}
