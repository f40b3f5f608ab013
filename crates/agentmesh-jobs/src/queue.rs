//! FIFO job queue with drain accounting
//!
//! Multiple producers (capability tools, HTTP triggers) and multiple
//! consumers (workers). `task_done`/`join` mirror the usual work-queue
//! accounting: every `put` adds one unit of work, every `task_done`
//! retires one, and `join` resolves once the count reaches zero.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Default)]
pub struct JobQueue {
    items: Mutex<VecDeque<String>>,
    available: Notify,
    unfinished: AtomicUsize,
    drained: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            unfinished: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a job id.
    pub fn put(&self, job_id: &str) {
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        self.lock().push_back(job_id.to_string());
        self.available.notify_one();
    }

    /// Dequeue the next job id, waiting until one is available.
    pub async fn get(&self) -> String {
        loop {
            let notified = self.available.notified();
            if let Some(id) = self.lock().pop_front() {
                return id;
            }
            notified.await;
        }
    }

    /// Retire one unit of work taken via `get`.
    pub fn task_done(&self) {
        let remaining = self.unfinished.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.drained.notify_waiters();
        }
    }

    /// Wait until every enqueued job has been retired with `task_done`.
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            if self.unfinished.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order() {
        let queue = JobQueue::new();
        queue.put("a");
        queue.put("b");
        queue.put("c");
        assert_eq!(queue.get().await, "a");
        assert_eq!(queue.get().await, "b");
        assert_eq!(queue.get().await, "c");
    }

    #[tokio::test]
    async fn get_waits_for_put() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.put("late");
        assert_eq!(consumer.await.unwrap(), "late");
    }

    #[tokio::test]
    async fn join_resolves_after_all_task_done() {
        let queue = Arc::new(JobQueue::new());
        queue.put("a");
        queue.put("b");

        let joiner = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.join().await })
        };

        let _ = queue.get().await;
        queue.task_done();
        assert!(!joiner.is_finished());

        let _ = queue.get().await;
        queue.task_done();
        tokio::time::timeout(Duration::from_secs(1), joiner)
            .await
            .expect("join should resolve once drained")
            .unwrap();
    }

    #[tokio::test]
    async fn join_on_empty_queue_is_immediate() {
        let queue = JobQueue::new();
        tokio::time::timeout(Duration::from_millis(50), queue.join())
            .await
            .expect("empty queue joins immediately");
    }

    #[tokio::test]
    async fn multiple_consumers_each_get_one() {
        let queue = Arc::new(JobQueue::new());
        let c1 = {
            let q = queue.clone();
            tokio::spawn(async move { q.get().await })
        };
        let c2 = {
            let q = queue.clone();
            tokio::spawn(async move { q.get().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.put("x");
        queue.put("y");

        let mut got = vec![c1.await.unwrap(), c2.await.unwrap()];
        got.sort();
        assert_eq!(got, vec!["x", "y"]);
    }
}
