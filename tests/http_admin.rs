//! Admin HTTP surface tests

use agentmesh::http::{admin_router, AdminState};
use agentmesh_agent::{AgentHost, AgentRegistry};
use agentmesh_core::OutputSchema;
use agentmesh_jobs::{JobQueue, JobStatus, JobStore};
use agentmesh_runner::Agent;
use std::sync::Arc;

async fn serve_admin_for_test() -> (String, Arc<AdminState>) {
    let store = Arc::new(JobStore::new());
    let queue = Arc::new(JobQueue::new());
    let agents = Arc::new(AgentRegistry::new());

    let agent = Arc::new(Agent::new(
        "Echo",
        "You are Echo.",
        "text",
        "o4-mini",
        OutputSchema::any("EchoResponse"),
        Vec::new(),
    ));
    let host = AgentHost::start(agent, "default", store.clone(), queue.clone())
        .await
        .unwrap();
    agents.insert(Arc::new(host));

    let state = Arc::new(AdminState {
        agents,
        store,
        queue,
    });

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = admin_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn health_route_reports_running() {
    let (base, _state) = serve_admin_for_test().await;
    let body: serde_json::Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "message": "Server is running" }));
}

#[tokio::test]
async fn run_route_submits_a_job() {
    let (base, state) = serve_admin_for_test().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/Echo/run", base))
        .json(&serde_json::json!({ "prompt": "hi there" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "started", "agent": "Echo" }));

    let job_id = state.queue.get().await;
    let job = state.store.get(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::InQueue);
    assert_eq!(job.initial_text, "hi there");
    assert_eq!(job.strategy_name, "default");
}

#[tokio::test]
async fn run_route_rejects_unknown_agent() {
    let (base, state) = serve_admin_for_test().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/Nobody/run", base))
        .json(&serde_json::json!({ "prompt": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);
    assert!(state.queue.is_empty());
}

#[tokio::test]
async fn run_route_defaults_missing_prompt() {
    let (base, state) = serve_admin_for_test().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/Echo/run", base))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let job_id = state.queue.get().await;
    assert_eq!(state.store.get(&job_id).unwrap().initial_text, "");
}
