//! Agentmesh — multi-agent orchestration runtime
//!
//! Binary-side plumbing: the admin HTTP surface, logging setup, and the
//! interactive chat loop. The runtime itself lives in the member crates.

pub mod http;
pub mod logging;
pub mod repl;
