//! Agentmesh Jobs - the scheduling core
//!
//! Jobs are single executions of an agent against an initial prompt. The
//! [`JobStore`] is the only owner of job state, the [`JobQueue`] hands jobs
//! to a fixed pool of workers, and a per-job termination strategy decides
//! after every model turn whether the conversation is finished.

pub mod job;
pub mod queue;
pub mod strategy;
pub mod worker;

pub use job::{Job, JobStatus, JobStore};
pub use queue::JobQueue;
pub use strategy::{
    ChatStrategy, ContinueLastUnchecked, PlanWatcher, StrategyRegistry, CONTINUE_MESSAGE,
    EMPTY_PLAN_MESSAGE,
};
pub use worker::{JobRuntime, WorkerOptions, WorkerPool, RESUME_MESSAGE};
