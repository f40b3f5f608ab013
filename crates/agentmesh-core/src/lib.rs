//! Agentmesh Core - Types, configuration records, wire protocol, and error handling

pub mod config;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod types;

pub use config::{discover_configs, AgentConfig};
pub use error::{Error, Result};
pub use protocol::*;
pub use schema::OutputSchema;
pub use types::*;
