//! agentmesh-run — trigger an agent through a running admin surface
//!
//! Health-checks the local runtime, starts one when nothing is listening,
//! then POSTs the prompt to the agent's run endpoint.

use clap::Parser;
use std::time::Duration;

const BASE_URL: &str = "http://127.0.0.1:9000";

#[derive(Parser)]
#[command(name = "agentmesh-run", about = "Trigger an agent on the local runtime")]
struct Cli {
    /// Agent to target
    agent_name: String,

    /// Input prompt
    prompt: String,
}

async fn server_is_up(client: &reqwest::Client) -> bool {
    client
        .get(format!("{}/", BASE_URL))
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

/// Make sure a runtime is listening, spawning `agentmesh -v` when none is.
async fn ensure_server(client: &reqwest::Client) -> anyhow::Result<()> {
    if server_is_up(client).await {
        return Ok(());
    }

    std::process::Command::new("agentmesh")
        .arg("-v")
        .spawn()
        .map_err(|e| anyhow::anyhow!("could not start agentmesh: {}", e))?;

    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if server_is_up(client).await {
            return Ok(());
        }
    }
    anyhow::bail!("agentmesh HTTP server did not come up on {}", BASE_URL);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    ensure_server(&client).await?;

    let response = client
        .post(format!("{}/{}/run", BASE_URL, cli.agent_name))
        .json(&serde_json::json!({ "prompt": cli.prompt }))
        .send()
        .await?
        .error_for_status()?;

    let body: serde_json::Value = response.json().await?;
    println!("{}", body);
    Ok(())
}
