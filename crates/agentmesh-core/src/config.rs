//! Agent configuration records and discovery
//!
//! Each agent lives in its own folder under the agents root:
//!
//! ```text
//! agents_config/EchoAgent/
//!   config.json       # the AgentConfig record
//!   prompt.md         # instructions, named by config.prompt_file
//!   return_type.json  # output schema definitions, selected by config.return_type
//! ```
//!
//! Pure types and parsing only. Topological ordering and instantiation live
//! in agentmesh-agent.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_strategy() -> String {
    "default".to_string()
}

/// Declarative record for one agent, parsed from `config.json`.
///
/// Unknown keys are tolerated and ignored. `strategy_name` defaults to
/// `"default"`, `model` to the system default chosen at load time.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub prompt_file: String,
    pub return_type: String,
    pub inputs_description: String,
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_strategy")]
    pub strategy_name: String,
    #[serde(skip)]
    pub folder: PathBuf,
}

impl AgentConfig {
    /// Absolute path of this agent's prompt file.
    pub fn prompt_path(&self) -> PathBuf {
        self.folder.join(&self.prompt_file)
    }

    /// Absolute path of this agent's output schema file.
    pub fn return_type_path(&self) -> PathBuf {
        self.folder.join("return_type.json")
    }
}

/// Read every subfolder of `agents_dir` that carries a `config.json`.
///
/// Returns configs keyed by agent name. Malformed configs and duplicate
/// names are fatal — configuration errors abort startup.
pub fn discover_configs(agents_dir: &Path) -> Result<HashMap<String, AgentConfig>> {
    let mut configs = HashMap::new();

    let entries = std::fs::read_dir(agents_dir).map_err(|e| {
        Error::config(format!(
            "cannot read agents directory {}: {}",
            agents_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let folder = entry?.path();
        let cfg_path = folder.join("config.json");
        if !folder.is_dir() || !cfg_path.exists() {
            continue;
        }

        let raw = std::fs::read_to_string(&cfg_path)?;
        let mut config: AgentConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {}", cfg_path.display(), e)))?;
        config.folder = folder;

        debug!(agent = %config.name, folder = %config.folder.display(), "discovered agent config");

        if let Some(previous) = configs.insert(config.name.clone(), config) {
            return Err(Error::config(format!(
                "duplicate agent name '{}' (first seen in {})",
                previous.name,
                previous.folder.display()
            )));
        }
    }

    Ok(configs)
}
