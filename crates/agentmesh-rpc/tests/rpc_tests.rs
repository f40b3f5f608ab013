//! Round-trip tests for the capability server/client pair

use agentmesh_rpc::{CapabilityClient, CapabilityServer, ToolSet};
use serde_json::json;

async fn demo_server() -> CapabilityServer {
    let mut tools = ToolSet::new();
    tools.register_fn("echo", "echoes its arguments", |args| async move { Ok(args) });
    tools.register_fn("greet", "greets a name", |args| async move {
        let name = args
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing 'name'".to_string())?;
        Ok(json!(format!("Hello, {}!", name)))
    });
    tools.register_fn("explode", "always fails", |_| async move {
        Err("kaboom".to_string())
    });

    CapabilityServer::serve("demo", 0, tools).await.unwrap()
}

#[tokio::test]
async fn call_round_trip() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());
    client.connect().await.unwrap();

    let value = client
        .call_tool("greet", json!({"name": "world"}))
        .await
        .unwrap();
    assert_eq!(value, json!("Hello, world!"));

    server.shutdown().await;
}

#[tokio::test]
async fn tool_arguments_pass_through() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());

    let payload = json!({"nested": {"list": [1, 2, 3]}, "flag": true});
    let value = client.call_tool("echo", payload.clone()).await.unwrap();
    assert_eq!(value, payload);

    server.shutdown().await;
}

#[tokio::test]
async fn handler_error_surfaces_as_error_payload() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());

    let err = client.call_tool("explode", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("kaboom"), "got: {}", err);

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_tool_surfaces_as_error_payload() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());

    let err = client.call_tool("nope", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("Tool not found: nope"), "got: {}", err);

    server.shutdown().await;
}

#[tokio::test]
async fn listing_reports_registered_tools() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());

    let listing = client.list_tools().await.unwrap();
    let names: Vec<&str> = listing.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "explode", "greet"]);

    server.shutdown().await;
}

#[tokio::test]
async fn connect_is_idempotent() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());

    client.connect().await.unwrap();
    client.connect().await.unwrap();

    server.shutdown().await;
}

#[tokio::test]
async fn connect_fails_against_dead_endpoint() {
    // Nothing listens on this port; a single attempt keeps the test fast.
    let client = CapabilityClient::new("ghost", "http://127.0.0.1:1");
    let err = client.connect_with(1).await.unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn calls_work_without_explicit_connect() {
    let server = demo_server().await;
    let client = CapabilityClient::new("demo", server.url());

    // connect() is a liveness gate, not a session handshake
    let value = client.call_tool("echo", json!(1)).await.unwrap();
    assert_eq!(value, json!(1));

    server.shutdown().await;
}
