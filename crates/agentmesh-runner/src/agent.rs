//! The runner-facing agent

use agentmesh_core::{OutputSchema, Result};
use agentmesh_rpc::CapabilityClient;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// One configured actor: instructions, a structured output type, a model
/// id, and the capability clients it may call as tools.
///
/// The model id is behind a lock so it can be swapped at runtime (the
/// `change_agent_model` system tool); everything else is fixed at load.
pub struct Agent {
    name: String,
    instructions: String,
    inputs_description: String,
    model: RwLock<String>,
    output_schema: OutputSchema,
    tools: Vec<Arc<CapabilityClient>>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        inputs_description: impl Into<String>,
        model: impl Into<String>,
        output_schema: OutputSchema,
        tools: Vec<Arc<CapabilityClient>>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            inputs_description: inputs_description.into(),
            model: RwLock::new(model.into()),
            output_schema,
            tools,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn inputs_description(&self) -> &str {
        &self.inputs_description
    }

    pub fn output_schema(&self) -> &OutputSchema {
        &self.output_schema
    }

    pub fn tools(&self) -> &[Arc<CapabilityClient>] {
        &self.tools
    }

    pub async fn model(&self) -> String {
        self.model.read().await.clone()
    }

    pub async fn set_model(&self, model: &str) {
        *self.model.write().await = model.to_string();
        info!(agent = %self.name, model, "agent model changed");
    }

    /// Assert connectivity to every outbound capability server.
    ///
    /// Idempotent per client; the autonomous-chat loop calls this before
    /// every run in case a server came up after this agent loaded.
    pub async fn connect_tools(&self) -> Result<()> {
        for tool in &self.tools {
            tool.connect().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}
