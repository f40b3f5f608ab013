//! Job state and the process-wide job store

use crate::queue::JobQueue;
use agentmesh_core::{short_job_id, ChatMessage, Error, Result};
use agentmesh_runner::Agent;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Lifecycle of a job.
///
/// Transitions are monotonic except for `in_progress -> in_queue`, the
/// suspend path a job takes when it starts waiting on children.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InDraft,
    InQueue,
    InProgress,
    Done,
    Error,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InDraft => "in_draft",
            Self::InQueue => "in_queue",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

fn transition_allowed(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    matches!(
        (from, to),
        (InDraft, InQueue) | (InQueue, InProgress) | (InProgress, Done) | (InProgress, Error) | (InProgress, InQueue)
    )
}

/// One execution of one agent against one initial prompt.
#[derive(Clone)]
pub struct Job {
    pub job_id: String,
    pub agent: Arc<Agent>,
    pub initial_text: String,
    pub strategy_name: String,
    pub depends_on: Vec<String>,
    pub status: JobStatus,
    pub chat_history: Vec<ChatMessage>,
    pub summary: Option<String>,
    /// Scheduler notes injected since the current turn began. The worker's
    /// end-of-turn persist replaces the transcript with the runner's view,
    /// which predates the notes; draining this keeps them from being lost.
    pending_notes: Vec<ChatMessage>,
}

/// Single source of truth for job state.
///
/// The store exclusively owns its jobs; every other component holds only a
/// job id and reads snapshots. One mutex over the map covers all
/// read-modify-write sequences, and it is never held across an await.
#[derive(Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Job>> {
        // A poisoned map only means another worker panicked mid-update;
        // job state itself stays usable.
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a job and hand it to the queue. The job is visible in the
    /// store strictly before it can be dequeued.
    pub fn submit(
        &self,
        queue: &JobQueue,
        agent: Arc<Agent>,
        text: impl Into<String>,
        strategy_name: impl Into<String>,
        depends_on: Vec<String>,
    ) -> String {
        let job_id = short_job_id();
        let job = Job {
            job_id: job_id.clone(),
            agent,
            initial_text: text.into(),
            strategy_name: strategy_name.into(),
            depends_on,
            status: JobStatus::InQueue,
            chat_history: Vec::new(),
            summary: None,
            pending_notes: Vec::new(),
        };
        info!(job = %job_id, agent = %job.agent.name(), strategy = %job.strategy_name, "job submitted");
        self.lock().insert(job_id.clone(), job);
        queue.put(&job_id);
        job_id
    }

    /// Snapshot of a job, if it exists.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.lock().get(job_id).cloned()
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.lock().get(job_id).map(|j| j.status)
    }

    /// Ids of every job currently `done`.
    pub fn done_jobs(&self) -> HashSet<String> {
        self.lock()
            .iter()
            .filter(|(_, job)| job.status == JobStatus::Done)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// The subset of a job's dependencies that are not yet done, computed
    /// under a single lock so no dependency completion can be missed.
    pub fn unmet(&self, job_id: &str) -> Vec<String> {
        let jobs = self.lock();
        let Some(job) = jobs.get(job_id) else {
            return Vec::new();
        };
        job.depends_on
            .iter()
            .filter(|dep| jobs.get(*dep).map(|d| d.status) != Some(JobStatus::Done))
            .cloned()
            .collect()
    }

    /// Transition a job's status; disallowed transitions are an error.
    pub fn mark(&self, job_id: &str, status: JobStatus) -> Result<()> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::JobNotFound(job_id.to_string()))?;
        if !transition_allowed(job.status, status) {
            return Err(Error::Internal(format!(
                "job {}: transition {} -> {} not allowed",
                job_id, job.status, status
            )));
        }
        debug!(job = %job_id, from = %job.status, to = %status, "status transition");
        job.status = status;
        Ok(())
    }

    /// Replace a job's transcript with the latest snapshot, then re-append
    /// any scheduler notes injected while the turn was in flight. History
    /// only ever grows; earlier entries are never rewritten.
    pub fn set_history(&self, job_id: &str, history: Vec<ChatMessage>) {
        if let Some(job) = self.lock().get_mut(job_id) {
            job.chat_history = history;
            let notes = std::mem::take(&mut job.pending_notes);
            job.chat_history.extend(notes);
        }
    }

    pub fn set_summary(&self, job_id: &str, summary: impl Into<String>) {
        if let Some(job) = self.lock().get_mut(job_id) {
            job.summary = Some(summary.into());
        }
    }

    /// Suspend `waiter` until the given children complete: append the
    /// dependencies, inject one scheduler note per child, and move the
    /// waiter to `in_queue`. All of it happens under one lock, so a worker
    /// that picks the waiter up next always observes the new dependencies.
    ///
    /// Returns whether the caller must re-enqueue the waiter — false when
    /// the job already suspended earlier in the same turn, which would
    /// otherwise put it on the queue twice.
    pub fn suspend_on(&self, waiter_id: &str, child_ids: &[String]) -> Result<bool> {
        let mut jobs = self.lock();
        let waiter = jobs
            .get_mut(waiter_id)
            .ok_or_else(|| Error::JobNotFound(waiter_id.to_string()))?;

        for child in child_ids {
            waiter.depends_on.push(child.clone());
            let note = ChatMessage::system(format!("Job {} has been started.", child));
            waiter.chat_history.push(note.clone());
            waiter.pending_notes.push(note);
        }

        match waiter.status {
            JobStatus::InProgress => {
                waiter.status = JobStatus::InQueue;
                info!(job = %waiter_id, waiting_on = ?child_ids, "job suspended on children");
                Ok(true)
            }
            JobStatus::InQueue => Ok(false),
            other => Err(Error::Internal(format!(
                "job {}: cannot wait on children while {}",
                waiter_id, other
            ))),
        }
    }
}
