//! Agentmesh RPC - capability servers and clients
//!
//! A capability server exposes a set of named tools over a small HTTP
//! surface with SSE-framed responses (see agentmesh_core::protocol for the
//! wire format). Every loaded agent hosts one, the process hosts one for
//! system tools, and external tool processes speak the same protocol.

pub mod client;
pub mod ports;
pub mod server;
pub mod tool;

pub use client::CapabilityClient;
pub use ports::next_port;
pub use server::CapabilityServer;
pub use tool::{ToolHandler, ToolSet};
