//! Worker pool and the autonomous-chat loop
//!
//! N workers share one queue. A worker holds a job for at most one loop
//! invocation: the job either completes, suspends itself onto the queue, or
//! runs out of turns. Jobs with unmet dependencies are requeued after a
//! fixed backoff from a detached task so the worker never blocks on them.

use crate::job::{JobStatus, JobStore};
use crate::queue::JobQueue;
use crate::strategy::StrategyRegistry;
use agentmesh_core::{extract_summary, ChatMessage, Error, Result};
use agentmesh_runner::{AgentRunner, LogHooks};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const RESUME_MESSAGE: &str = "Jobs waited have ended. Resume your task.";

/// Everything a worker needs, injected as one value.
pub struct JobRuntime {
    pub store: Arc<JobStore>,
    pub queue: Arc<JobQueue>,
    pub strategies: Arc<StrategyRegistry>,
    pub runner: Arc<dyn AgentRunner>,
}

#[derive(Clone, Copy, Debug)]
pub struct WorkerOptions {
    pub workers: usize,
    pub max_turns: usize,
    pub requeue_backoff: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            max_turns: 30,
            requeue_backoff: Duration::from_secs(300),
        }
    }
}

/// A running pool of chat workers.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(runtime: Arc<JobRuntime>, options: WorkerOptions) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..options.workers)
            .map(|n| {
                let runtime = runtime.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { worker_loop(n, runtime, options, cancel).await })
            })
            .collect();
        info!(workers = options.workers, "chat workers started");
        Self { cancel, handles }
    }

    /// Cancel the dequeue waits and join every worker. In-flight runner
    /// calls finish their current turn first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("chat workers stopped");
    }
}

async fn worker_loop(
    worker: usize,
    runtime: Arc<JobRuntime>,
    options: WorkerOptions,
    cancel: CancellationToken,
) {
    loop {
        let job_id = tokio::select! {
            _ = cancel.cancelled() => break,
            job_id = runtime.queue.get() => job_id,
        };

        let unmet = runtime.store.unmet(&job_id);
        if !unmet.is_empty() {
            info!(worker, job = %job_id, ?unmet, "dependencies unmet, requeuing with backoff");
            let queue = runtime.queue.clone();
            let delayed = job_id.clone();
            let backoff = options.requeue_backoff;
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                queue.put(&delayed);
            });
            runtime.queue.task_done();
            continue;
        }

        if let Err(e) = runtime.store.mark(&job_id, JobStatus::InProgress) {
            warn!(worker, job = %job_id, "cannot start job: {}", e);
            runtime.queue.task_done();
            continue;
        }

        match autonomous_chat(&runtime, &job_id, options.max_turns).await {
            Ok(()) => match runtime.store.status(&job_id) {
                Some(JobStatus::Done) => {
                    info!(worker, job = %job_id, "job completed");
                }
                Some(JobStatus::InQueue) => {
                    info!(worker, job = %job_id, "job suspended, back on the queue");
                }
                Some(JobStatus::InProgress) => {
                    info!(worker, job = %job_id, "max turns reached, job remains in progress");
                }
                status => {
                    warn!(worker, job = %job_id, ?status, "job left in unexpected state");
                }
            },
            Err(e) => {
                error!(worker, job = %job_id, "job failed: {}", e);
                if let Err(mark_err) = runtime.store.mark(&job_id, JobStatus::Error) {
                    warn!(job = %job_id, "could not record error status: {}", mark_err);
                }
            }
        }

        runtime.queue.task_done();
    }
}

/// Drive one job's conversation until the strategy ends it, the job
/// suspends itself, or `max_turns` runs out.
async fn autonomous_chat(runtime: &JobRuntime, job_id: &str, max_turns: usize) -> Result<()> {
    let job = runtime
        .store
        .get(job_id)
        .ok_or_else(|| Error::JobNotFound(job_id.to_string()))?;

    // Outbound capability servers may still be starting; bounded retries.
    job.agent.connect_tools().await?;

    let mut strategy = runtime.strategies.create(&job.strategy_name);

    let mut history: Vec<ChatMessage>;
    let mut current_message: String;
    if job.chat_history.is_empty() {
        history = Vec::new();
        let mut parts = vec![format!("Your JOB_ID is {}.", job.job_id)];
        parts.push(job.initial_text.clone());
        let start = strategy.start_instruction();
        if !start.is_empty() {
            parts.push(start.to_string());
        }
        current_message = parts.join(" ");
        info!(job = %job_id, "starting new job with initial prompt: {}", current_message);
    } else {
        history = job.chat_history.clone();
        current_message = RESUME_MESSAGE.to_string();
        info!(job = %job_id, "resuming job with {} prior entries", history.len());
    }

    let hooks = LogHooks;

    for turn in 1..=max_turns {
        info!(job = %job_id, turn, max_turns, "turn");

        let mut input = history.clone();
        input.push(ChatMessage::user(current_message.clone()));

        match runtime.runner.run(&job.agent, input, &hooks).await {
            Ok(result) => {
                history = result.history;
                runtime.store.set_history(job_id, history.clone());

                if let Some(summary) = extract_summary(&result.final_output) {
                    runtime.store.set_summary(job_id, summary);
                }

                let (end, next_message) = strategy.next_turn(
                    &result.final_output,
                    &history,
                    &job.agent,
                    job_id,
                    &runtime.store,
                );

                if end {
                    info!(job = %job_id, "approved by strategy after {} turn(s)", turn);
                    if let Err(e) = runtime.store.mark(job_id, JobStatus::Done) {
                        warn!(job = %job_id, "could not mark done: {}", e);
                    }
                    return Ok(());
                }

                if runtime.store.status(job_id) != Some(JobStatus::InProgress) {
                    // Suspended via a wait tool mid-turn; leave status alone.
                    return Ok(());
                }

                match next_message {
                    Some(message) => current_message = message,
                    None => return Ok(()),
                }
            }
            Err(e) => {
                error!(job = %job_id, turn, "runner failed: {}", e);
                current_message = format!(
                    "The last attempt failed with an error: {}. Please review the situation, check your plan, and try to recover and continue the task.",
                    e
                );
            }
        }
    }

    info!(job = %job_id, max_turns, "max turns reached, history saved, job stays in progress");
    Ok(())
}
