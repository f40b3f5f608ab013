//! Agent loading: topological ordering and instantiation

use crate::host::AgentHost;
use crate::registry::AgentRegistry;
use agentmesh_core::{AgentConfig, Error, OutputSchema, Result};
use agentmesh_jobs::{JobQueue, JobStore};
use agentmesh_rpc::CapabilityClient;
use agentmesh_runner::Agent;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_MODEL: &str = "o4-mini";

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Gray,
    Black,
}

/// Order agents so every agent appears after the agents it uses as tools.
///
/// Tool names that do not name a config (external capability servers) are
/// ignored for ordering. A cycle among agent-typed tools is a distinguished
/// error and aborts startup.
pub fn topo_sort(configs: &HashMap<String, AgentConfig>) -> Result<Vec<String>> {
    // Edges run dep -> dependent, so a reversed post-order finishes with
    // dependencies first.
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, config) in configs {
        for dep in &config.tools {
            if configs.contains_key(dep) {
                graph.entry(dep.as_str()).or_default().push(name.as_str());
            }
        }
    }

    // Sorted roots and edges keep the order reproducible across runs.
    let mut nodes: Vec<&str> = configs.keys().map(|s| s.as_str()).collect();
    nodes.sort_unstable();
    for dependents in graph.values_mut() {
        dependents.sort_unstable();
    }

    fn visit<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(node) {
            Some(Mark::Gray) => return Err(Error::CyclicDependency(node.to_string())),
            Some(Mark::Black) => return Ok(()),
            None => {}
        }
        marks.insert(node, Mark::Gray);
        if let Some(dependents) = graph.get(node) {
            for next in dependents {
                visit(next, graph, marks, order)?;
            }
        }
        marks.insert(node, Mark::Black);
        order.push(node.to_string());
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut order = Vec::new();
    for node in nodes {
        visit(node, &graph, &mut marks, &mut order)?;
    }
    order.reverse();

    info!(?order, "agent load order");
    Ok(order)
}

/// Instantiate every agent in load order, resolving each tool name to an
/// already-loaded agent or a pre-registered external server.
///
/// A name matching both resolves to the agent: agents-as-tools win over
/// externals of the same name.
pub async fn load_agents(
    configs: &HashMap<String, AgentConfig>,
    order: &[String],
    externals: &HashMap<String, Arc<CapabilityClient>>,
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
) -> Result<AgentRegistry> {
    let registry = AgentRegistry::new();

    for name in order {
        match load_agent(name, configs, externals, &registry, &store, &queue).await {
            Ok(host) => registry.insert(host),
            Err(e) => {
                // Servers that already came up must not outlive the failed
                // startup.
                registry.shutdown_all().await;
                return Err(e);
            }
        }
    }

    info!(agents = ?registry.names(), "agents loaded");
    Ok(registry)
}

async fn load_agent(
    name: &str,
    configs: &HashMap<String, AgentConfig>,
    externals: &HashMap<String, Arc<CapabilityClient>>,
    registry: &AgentRegistry,
    store: &Arc<JobStore>,
    queue: &Arc<JobQueue>,
) -> Result<Arc<AgentHost>> {
    let config = configs
        .get(name)
        .ok_or_else(|| Error::config(format!("'{}' in load order has no config", name)))?;

    let instructions = std::fs::read_to_string(config.prompt_path()).map_err(|e| {
        Error::config(format!(
            "cannot read prompt for '{}' at {}: {}",
            name,
            config.prompt_path().display(),
            e
        ))
    })?;

    let schema = OutputSchema::from_file(&config.return_type_path(), &config.return_type)?;

    let mut tool_clients = Vec::new();
    for tool in &config.tools {
        if configs.contains_key(tool) {
            let host = registry.get(tool).ok_or_else(|| {
                Error::Internal(format!(
                    "agent '{}' required before its dependency '{}' was loaded",
                    name, tool
                ))
            })?;
            tool_clients.push(host.client());
        } else if let Some(client) = externals.get(tool) {
            tool_clients.push(client.clone());
        } else {
            return Err(Error::UnresolvedTool {
                agent: name.to_string(),
                tool: tool.clone(),
            });
        }
    }

    let model = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let agent = Arc::new(Agent::new(
        &config.name,
        instructions,
        &config.inputs_description,
        model,
        schema,
        tool_clients,
    ));

    // Unknown strategy names are not validated here; the strategy registry
    // falls back to the default with a warning on first use.
    let host = AgentHost::start(
        agent,
        config.strategy_name.clone(),
        store.clone(),
        queue.clone(),
    )
    .await?;
    Ok(Arc::new(host))
}
