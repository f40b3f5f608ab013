//! Registry of loaded agents. Thread-safe, concurrent access.

use crate::host::AgentHost;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, Arc<AgentHost>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    pub fn insert(&self, host: Arc<AgentHost>) {
        self.agents.insert(host.name().to_string(), host);
    }

    pub fn get(&self, name: &str) -> Option<Arc<AgentHost>> {
        self.agents.get(name).map(|h| h.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.iter().map(|e| e.key().clone()).collect()
    }

    pub fn hosts(&self) -> Vec<Arc<AgentHost>> {
        self.agents.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Stop every hosted capability server, releasing ports and clients.
    pub async fn shutdown_all(&self) {
        for entry in self.agents.iter() {
            entry.value().shutdown().await;
        }
    }
}
