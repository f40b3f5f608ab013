//! Agentmesh Runner - the runner-facing agent and the AgentRunner seam
//!
//! The scheduler core treats model invocation as an external collaborator:
//! it hands an [`Agent`] plus a conversation to an [`AgentRunner`] and gets
//! back a structured final output and the updated transcript. Everything
//! behind that trait (model transport, tool dispatch) is replaceable; the
//! crate ships an OpenAI-compatible implementation and a scripted double
//! for tests.

pub mod agent;
pub mod hooks;
pub mod openai;
pub mod runner;
pub mod scripted;

pub use agent::Agent;
pub use hooks::{LogHooks, RunHooks};
pub use openai::OpenAiRunner;
pub use runner::{AgentRunner, RunnerError, TurnResult};
pub use scripted::{ScriptedRunner, ScriptedTurn};
