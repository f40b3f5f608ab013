//! Tool handler trait and the per-server tool set

use agentmesh_core::{ToolInfo, ToolListing};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A named tool hosted on a capability server.
///
/// Handlers return `Err(message)` for failures the caller should see as an
/// error payload; they must not panic.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, arguments: Value) -> Result<Value, String>;
}

/// A tool built from an async closure, for tools whose behavior is
/// assembled at load time (e.g. the per-agent start tools).
pub struct FnTool {
    name: String,
    description: String,
    handler: Box<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>,
}

#[async_trait::async_trait]
impl ToolHandler for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, arguments: Value) -> Result<Value, String> {
        (self.handler)(arguments).await
    }
}

/// The set of tools one capability server exposes.
#[derive(Default)]
pub struct ToolSet {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl ToolHandler + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a tool backed by an async closure.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, description: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, String>> + Send + 'static,
    {
        let name = name.into();
        self.tools.insert(
            name.clone(),
            Arc::new(FnTool {
                name,
                description: description.into(),
                handler: Box::new(move |args| Box::pin(f(args))),
            }),
        );
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Dispatch a call to the named tool.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, String> {
        match self.tools.get(name) {
            Some(tool) => tool.call(arguments).await,
            None => Err(format!("Tool not found: {}", name)),
        }
    }

    pub fn listing(&self) -> ToolListing {
        let mut tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        ToolListing { tools }
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fn_tool_dispatch() {
        let mut set = ToolSet::new();
        set.register_fn("echo", "echoes its input", |args| async move { Ok(args) });

        let out = set.call("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_payload() {
        let set = ToolSet::new();
        let err = set.call("missing", json!(null)).await.unwrap_err();
        assert_eq!(err, "Tool not found: missing");
    }

    #[tokio::test]
    async fn listing_is_sorted() {
        let mut set = ToolSet::new();
        set.register_fn("zeta", "", |_| async { Ok(json!(null)) });
        set.register_fn("alpha", "", |_| async { Ok(json!(null)) });
        let listing = set.listing();
        assert_eq!(listing.tools[0].name, "alpha");
        assert_eq!(listing.tools[1].name, "zeta");
    }
}
