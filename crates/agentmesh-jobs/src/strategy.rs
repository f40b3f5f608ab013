//! Termination strategies
//!
//! A strategy inspects every turn's structured output and decides whether
//! the job is complete, needs another turn with a corrective message, or
//! was suspended from outside. Strategies are per-job instances created
//! fresh for each worker invocation, so they may carry state across turns
//! of one run.

use crate::job::{JobStatus, JobStore};
use agentmesh_core::{parse_plan, ChatMessage, PlanStep};
use agentmesh_runner::Agent;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const CONTINUE_MESSAGE: &str = "Continue with the first step of the plan that is not checked yet. And after verifing the step goal mark it as checked.";
pub const EMPTY_PLAN_MESSAGE: &str = "Plan shouldn't be empty. Revisit the conversation history and generate a new plan according to your goals.";
const WATCHER_CONTINUE_MESSAGE: &str = "Continue with the first step of the plan that is not checked yet. And after verifying the step goal mark it as checked.";
const START_INSTRUCTION: &str = "Start by making a plan";

/// Per-job policy deciding when the conversation ends.
///
/// `next_turn` returns `(end, next_message)`: `(true, None)` means the job
/// is complete, `(false, Some(msg))` asks for another turn with `msg` as
/// the next user message, and `(false, None)` tells the loop to stop
/// without marking the job done (the job was suspended externally).
pub trait ChatStrategy: Send {
    /// Appended to the very first user message of a job.
    fn start_instruction(&self) -> &str {
        START_INSTRUCTION
    }

    fn next_turn(
        &mut self,
        final_output: &Value,
        history: &[ChatMessage],
        agent: &Agent,
        job_id: &str,
        store: &JobStore,
    ) -> (bool, Option<String>);
}

/// Queries the job status fresh; anything but `in_progress` means the loop
/// must wind down without touching the status.
fn externally_suspended(job_id: &str, store: &JobStore, strategy: &str) -> bool {
    let status = store.status(job_id);
    if status != Some(JobStatus::InProgress) {
        info!(
            job = %job_id,
            status = %status.map(|s| s.to_string()).unwrap_or_else(|| "not found".into()),
            "{}: job no longer in progress, signaling run to end",
            strategy
        );
        return true;
    }
    false
}

/// Default strategy: keep the agent working on the first unchecked plan
/// step until every step is checked.
#[derive(Default)]
pub struct ContinueLastUnchecked;

impl ChatStrategy for ContinueLastUnchecked {
    fn next_turn(
        &mut self,
        final_output: &Value,
        _history: &[ChatMessage],
        _agent: &Agent,
        job_id: &str,
        store: &JobStore,
    ) -> (bool, Option<String>) {
        if externally_suspended(job_id, store, "ContinueLastUnchecked") {
            return (false, None);
        }

        let plan = parse_plan(final_output);
        if plan.is_empty() {
            (false, Some(EMPTY_PLAN_MESSAGE.to_string()))
        } else if plan.iter().all(|step| step.checked) {
            (true, None)
        } else {
            (false, Some(CONTINUE_MESSAGE.to_string()))
        }
    }
}

/// Like the default strategy, but remembers the plan between turns and
/// complains when an unchecked step silently disappears from it.
#[derive(Default)]
pub struct PlanWatcher {
    plan_dict: HashMap<String, PlanStep>,
}

impl ChatStrategy for PlanWatcher {
    fn next_turn(
        &mut self,
        final_output: &Value,
        _history: &[ChatMessage],
        _agent: &Agent,
        job_id: &str,
        store: &JobStore,
    ) -> (bool, Option<String>) {
        if externally_suspended(job_id, store, "PlanWatcher") {
            return (false, None);
        }

        let plan = parse_plan(final_output);
        let new_plan_dict: HashMap<String, PlanStep> = plan
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let key = if step.step_name.is_empty() {
                    i.to_string()
                } else {
                    step.step_name.clone()
                };
                (key, step.clone())
            })
            .collect();

        let mut messages = Vec::new();
        for (step_name, old_step) in &self.plan_dict {
            if !new_plan_dict.contains_key(step_name) && !old_step.checked {
                messages.push(format!(
                    "The step: {} was unexpectedly removed from your plan, please review it and add it again properly.",
                    step_name
                ));
            }
        }

        self.plan_dict = new_plan_dict;

        if plan.is_empty() {
            messages.push(EMPTY_PLAN_MESSAGE.to_string());
            (false, Some(messages.join(" ")))
        } else if plan.iter().all(|step| step.checked) {
            (true, None)
        } else {
            if messages.is_empty() {
                messages.push(WATCHER_CONTINUE_MESSAGE.to_string());
            }
            (false, Some(messages.join(" ")))
        }
    }
}

type StrategyFactory = Arc<dyn Fn() -> Box<dyn ChatStrategy> + Send + Sync>;

/// Process-wide strategy registry.
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    /// A registry carrying the built-in strategies.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("default", || Box::<ContinueLastUnchecked>::default());
        registry.register("plan_watcher", || Box::<PlanWatcher>::default());
        registry
    }

    /// Register a strategy factory under a name. Replaces any previous
    /// registration with a warning.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ChatStrategy> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            warn!(strategy = %name, "strategy already registered, overwriting");
        }
    }

    /// Create a fresh per-job strategy instance. Unknown names fall back
    /// to the default strategy with a warning.
    pub fn create(&self, name: &str) -> Box<dyn ChatStrategy> {
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => {
                warn!(strategy = %name, "unknown strategy, falling back to default");
                Box::<ContinueLastUnchecked>::default()
            }
        }
    }
}
