//! Agentmesh Agent - loading, wiring, and hosting agents
//!
//! Turns a directory of agent folders into a fully wired set of running
//! agents: configs are discovered, ordered so dependencies load first, and
//! each agent comes up as a capability server other agents can call.

pub mod externals;
pub mod host;
pub mod loader;
pub mod registry;
pub mod system;

pub use externals::load_external_servers;
pub use host::AgentHost;
pub use loader::{load_agents, topo_sort, DEFAULT_MODEL};
pub use registry::AgentRegistry;
pub use system::{start_system_server, system_server_port, DEFAULT_SYSTEM_PORT};
