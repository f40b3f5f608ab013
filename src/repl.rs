//! Interactive chat loop against a single agent

use agentmesh_core::ChatMessage;
use agentmesh_runner::{Agent, AgentRunner, LogHooks};
use std::io::Write;
use std::sync::Arc;

const REPL_EXITS: &[&str] = &["/exit", "/quit", "exit", "quit"];

/// Read lines from stdin and run one agent turn per line. History is
/// threaded between turns; `/exit` leaves.
pub async fn user_chat(agent: Arc<Agent>, runner: Arc<dyn AgentRunner>) -> anyhow::Result<()> {
    agent.connect_tools().await?;

    let mut history: Vec<ChatMessage> = Vec::new();
    let hooks = LogHooks;

    loop {
        let line = tokio::task::spawn_blocking(|| {
            print!("You: ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|read| (read, line))
        })
        .await?;

        let text = match line {
            Ok((0, _)) => return Ok(()), // EOF
            Ok((_, line)) => line.trim().to_string(),
            Err(e) => return Err(e.into()),
        };

        if REPL_EXITS.contains(&text.to_lowercase().as_str()) {
            return Ok(());
        }
        if text.is_empty() {
            continue;
        }

        let mut input = history.clone();
        input.push(ChatMessage::user(text));

        match runner.run(&agent, input, &hooks).await {
            Ok(result) => {
                let reply = result
                    .final_output
                    .get("content")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .unwrap_or_else(|| result.final_output.to_string());
                println!("Assistant:\n{}", reply);
                history = result.history;
            }
            Err(e) => {
                eprintln!("Agent run failed: {}", e);
            }
        }
    }
}
