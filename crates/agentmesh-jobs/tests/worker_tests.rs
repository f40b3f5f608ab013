//! End-to-end worker scenarios against the scripted runner

use agentmesh_core::{ChatMessage, OutputSchema, Role};
use agentmesh_jobs::{
    JobQueue, JobRuntime, JobStatus, JobStore, StrategyRegistry, WorkerOptions, WorkerPool,
    CONTINUE_MESSAGE, RESUME_MESSAGE,
};
use agentmesh_runner::{Agent, AgentRunner, RunHooks, RunnerError, ScriptedRunner, ScriptedTurn, TurnResult};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn test_agent(name: &str) -> Arc<Agent> {
    Arc::new(Agent::new(
        name,
        format!("You are {}.", name),
        "free text",
        "o4-mini",
        OutputSchema::any("PlanOutput"),
        Vec::new(),
    ))
}

fn checked_plan() -> Value {
    json!({ "plan": [ { "step_name": "s1", "checked": true } ] })
}

fn unchecked_plan() -> Value {
    json!({ "plan": [ { "step_name": "s1", "checked": false } ] })
}

fn runtime_with(runner: Arc<dyn AgentRunner>) -> Arc<JobRuntime> {
    Arc::new(JobRuntime {
        store: Arc::new(JobStore::new()),
        queue: Arc::new(JobQueue::new()),
        strategies: Arc::new(StrategyRegistry::new()),
        runner,
    })
}

fn fast_options() -> WorkerOptions {
    WorkerOptions {
        workers: 2,
        max_turns: 30,
        requeue_backoff: Duration::from_millis(30),
    }
}

async fn join_with_timeout(queue: &JobQueue) {
    tokio::time::timeout(Duration::from_secs(10), queue.join())
        .await
        .expect("queue should drain");
}

// ===========================================================================
// Single agent, single turn
// ===========================================================================

#[tokio::test]
async fn single_turn_job_completes() {
    let runner = Arc::new(ScriptedRunner::constant(checked_plan()));
    let runtime = runtime_with(runner.clone());
    let pool = WorkerPool::spawn(runtime.clone(), fast_options());

    let agent = test_agent("Echo");
    let job_id = runtime
        .store
        .submit(&runtime.queue, agent, "hi", "default", vec![]);
    join_with_timeout(&runtime.queue).await;

    assert_eq!(runner.call_count().await, 1);
    assert_eq!(runtime.store.status(&job_id), Some(JobStatus::Done));

    let job = runtime.store.get(&job_id).unwrap();
    assert_eq!(job.chat_history.len(), 2);
    assert_eq!(job.chat_history[0].role, Role::User);
    assert_eq!(job.chat_history[1].role, Role::Assistant);

    pool.shutdown().await;
}

// ===========================================================================
// First user message composition
// ===========================================================================

#[tokio::test]
async fn first_message_carries_id_text_and_instruction() {
    let runner = Arc::new(ScriptedRunner::constant(checked_plan()));
    let runtime = runtime_with(runner.clone());
    let pool = WorkerPool::spawn(runtime.clone(), fast_options());

    let job_id = runtime
        .store
        .submit(&runtime.queue, test_agent("Echo"), "hi", "default", vec![]);
    join_with_timeout(&runtime.queue).await;

    let calls = runner.call_inputs().await;
    let first_message = &calls[0].last().unwrap().content;
    assert_eq!(
        *first_message,
        format!("Your JOB_ID is {}. hi Start by making a plan", job_id)
    );

    pool.shutdown().await;
}

// ===========================================================================
// Multi-turn correction
// ===========================================================================

#[tokio::test]
async fn unchecked_plan_triggers_corrective_turn() {
    let runner = Arc::new(ScriptedRunner::sequence(vec![
        ScriptedTurn::Output(unchecked_plan()),
        ScriptedTurn::Output(checked_plan()),
    ]));
    let runtime = runtime_with(runner.clone());
    let pool = WorkerPool::spawn(runtime.clone(), fast_options());

    let job_id = runtime
        .store
        .submit(&runtime.queue, test_agent("Echo"), "hi", "default", vec![]);
    join_with_timeout(&runtime.queue).await;

    assert_eq!(runner.call_count().await, 2);
    assert_eq!(runtime.store.status(&job_id), Some(JobStatus::Done));

    let calls = runner.call_inputs().await;
    let second_last = calls[1].last().unwrap();
    assert_eq!(second_last.role, Role::User);
    assert_eq!(second_last.content, CONTINUE_MESSAGE);

    pool.shutdown().await;
}

// ===========================================================================
// Max turns cap
// ===========================================================================

#[tokio::test]
async fn max_turns_leaves_job_in_progress() {
    let runner = Arc::new(ScriptedRunner::constant(unchecked_plan()));
    let runtime = runtime_with(runner.clone());
    let mut options = fast_options();
    options.max_turns = 3;
    let pool = WorkerPool::spawn(runtime.clone(), options);

    let job_id = runtime
        .store
        .submit(&runtime.queue, test_agent("Echo"), "hi", "default", vec![]);
    join_with_timeout(&runtime.queue).await;

    assert_eq!(runner.call_count().await, 3);
    assert_eq!(runtime.store.status(&job_id), Some(JobStatus::InProgress));
    assert!(runtime.queue.is_empty());

    pool.shutdown().await;
}

// ===========================================================================
// Transient runner error recovery
// ===========================================================================

#[tokio::test]
async fn runner_error_is_fed_back_as_user_message() {
    let runner = Arc::new(ScriptedRunner::sequence(vec![
        ScriptedTurn::Fail("connection reset".to_string()),
        ScriptedTurn::Output(checked_plan()),
    ]));
    let runtime = runtime_with(runner.clone());
    let pool = WorkerPool::spawn(runtime.clone(), fast_options());

    let job_id = runtime
        .store
        .submit(&runtime.queue, test_agent("Echo"), "hi", "default", vec![]);
    join_with_timeout(&runtime.queue).await;

    assert_eq!(runner.call_count().await, 2);
    assert_eq!(runtime.store.status(&job_id), Some(JobStatus::Done));

    let calls = runner.call_inputs().await;
    let retry_message = calls[1].last().unwrap();
    assert_eq!(retry_message.role, Role::User);
    assert!(
        retry_message
            .content
            .starts_with("The last attempt failed with an error:"),
        "got: {}",
        retry_message.content
    );
    assert!(retry_message.content.contains("connection reset"));

    pool.shutdown().await;
}

// ===========================================================================
// Resume uses the prior history plus the literal resume message
// ===========================================================================

#[tokio::test]
async fn resumed_job_prepends_history_and_resume_message() {
    let runner = Arc::new(ScriptedRunner::constant(checked_plan()));
    let runtime = runtime_with(runner.clone());

    // Stage a job that already has history, as after a suspension.
    let job_id = runtime
        .store
        .submit(&runtime.queue, test_agent("Echo"), "hi", "default", vec![]);
    let prior = vec![
        ChatMessage::user("Your JOB_ID is test. hi Start by making a plan"),
        ChatMessage::assistant("{\"plan\":[]}"),
        ChatMessage::system("Job abc123 has been started."),
    ];
    runtime.store.set_history(&job_id, prior.clone());

    let pool = WorkerPool::spawn(runtime.clone(), fast_options());
    join_with_timeout(&runtime.queue).await;

    let calls = runner.call_inputs().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(&calls[0][..prior.len()], &prior[..]);
    let resume = calls[0].last().unwrap();
    assert_eq!(resume.role, Role::User);
    assert_eq!(resume.content, RESUME_MESSAGE);
    assert_eq!(runtime.store.status(&job_id), Some(JobStatus::Done));

    pool.shutdown().await;
}

// ===========================================================================
// Dependency requeue path
// ===========================================================================

#[tokio::test]
async fn dependent_job_waits_for_its_dependency() {
    let runner = Arc::new(ScriptedRunner::constant(checked_plan()));
    let runtime = runtime_with(runner.clone());
    let pool = WorkerPool::spawn(runtime.clone(), fast_options());

    let dep = runtime
        .store
        .submit(&runtime.queue, test_agent("Dep"), "dep work", "default", vec![]);
    let parent = runtime.store.submit(
        &runtime.queue,
        test_agent("Parent"),
        "parent work",
        "default",
        vec![dep.clone()],
    );

    // join() can resolve while the parent sits in its delayed-requeue
    // window, so poll for the final state instead.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while runtime.store.status(&parent) != Some(JobStatus::Done) {
        assert!(tokio::time::Instant::now() < deadline, "parent never completed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(runtime.store.status(&dep), Some(JobStatus::Done));

    pool.shutdown().await;
}

// ===========================================================================
// Mid-turn suspension — strategy sees a non-in-progress job and backs off
// ===========================================================================

/// A runner that suspends the job onto the queue while the turn is still in
/// flight, the way a `_start_and_wait_*` tool call does.
struct SuspendingRunner {
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    job_id: std::sync::Mutex<String>,
    calls: std::sync::Mutex<usize>,
}

#[async_trait::async_trait]
impl AgentRunner for SuspendingRunner {
    async fn run(
        &self,
        _agent: &Agent,
        mut input: Vec<ChatMessage>,
        _hooks: &dyn RunHooks,
    ) -> Result<TurnResult, RunnerError> {
        *self.calls.lock().unwrap() += 1;
        let job_id = self.job_id.lock().unwrap().clone();
        let requeue = self
            .store
            .suspend_on(&job_id, &["child-job".to_string()])
            .expect("suspend should succeed");
        if requeue {
            self.queue.put(&job_id);
        }
        let output = json!({ "plan": [ { "step_name": "wait", "checked": false } ] });
        input.push(ChatMessage::assistant(output.to_string()));
        Ok(TurnResult {
            final_output: output,
            history: input,
        })
    }
}

#[tokio::test]
async fn suspended_job_stops_looping_and_stays_queued() {
    let store = Arc::new(JobStore::new());
    let queue = Arc::new(JobQueue::new());
    let job_id = store.submit(&queue, test_agent("Parent"), "work", "default", vec![]);

    let runner = Arc::new(SuspendingRunner {
        store: store.clone(),
        queue: queue.clone(),
        job_id: std::sync::Mutex::new(job_id.clone()),
        calls: std::sync::Mutex::new(0),
    });
    let runtime = Arc::new(JobRuntime {
        store: store.clone(),
        queue: queue.clone(),
        strategies: Arc::new(StrategyRegistry::new()),
        runner: runner.clone(),
    });

    // One worker: the first invocation suspends the job and re-enqueues
    // it; the worker then dequeues it again, finds the dependency unmet,
    // and parks it on the delayed requeue path instead of running it.
    let options = WorkerOptions {
        workers: 1,
        max_turns: 30,
        requeue_backoff: Duration::from_secs(300),
    };
    let pool = WorkerPool::spawn(runtime.clone(), options);

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(*runner.calls.lock().unwrap(), 1);
    assert_eq!(store.status(&job_id), Some(JobStatus::InQueue));
    let job = store.get(&job_id).unwrap();
    assert_eq!(job.depends_on, vec!["child-job"]);

    pool.shutdown().await;
}
