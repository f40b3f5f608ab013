//! Error types for Agentmesh

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("cyclic tool dependency at agent '{0}'")]
    CyclicDependency(String),

    #[error("unresolved tool '{tool}' on agent '{agent}'")]
    UnresolvedTool { agent: String, tool: String },

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("rpc error: {0}")]
    RpcError(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::RpcError(msg.into())
    }
}
