//! External capability-server registry
//!
//! External tool processes are described by JSON files in a sibling
//! directory, one descriptor per file:
//!
//! ```text
//! capability_servers/email_processor.json
//!   { "name": "email-processor", "url": "http://127.0.0.1:9002" }
//! ```
//!
//! The loader collects every descriptor into a stable name-to-handle map;
//! agents reference the names from their `tools` arrays.

use agentmesh_core::{Error, Result};
use agentmesh_rpc::CapabilityClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct ExternalServerSpec {
    name: String,
    url: String,
}

/// Build client handles for every `*.json` descriptor in `dir`.
///
/// A missing directory simply means no external servers. Duplicate names
/// overwrite with a warning.
pub fn load_external_servers(dir: &Path) -> Result<HashMap<String, Arc<CapabilityClient>>> {
    let mut servers = HashMap::new();

    if !dir.exists() {
        debug!(dir = %dir.display(), "no external server directory");
        return Ok(servers);
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let raw = std::fs::read_to_string(&path)?;
        let spec: ExternalServerSpec = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;

        let client = Arc::new(CapabilityClient::new(spec.name.clone(), spec.url));
        if servers.insert(spec.name.clone(), client).is_some() {
            warn!(server = %spec.name, "duplicate external server name, keeping the last one");
        }
    }

    info!(servers = ?servers.keys().collect::<Vec<_>>(), "external servers collected");
    Ok(servers)
}
