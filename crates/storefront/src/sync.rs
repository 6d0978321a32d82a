//! One-shot background sync queue.
//!
//! Local cart mutations complete synchronously; the matching server request
//! runs here, detached from the mutation's outcome. The policy is at most
//! once: no retry, no backoff, and no cancellation of in-flight tasks. The
//! submitter learns the outcome only through the callback (or the warn log),
//! never as a blocking error - a failed sync must not undo or delay the
//! local mutation.
//!
//! Requests submitted here have no ordering guarantee relative to each other
//! or to later local mutations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of a background sync task, delivered to the callback exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server accepted the request.
    Completed,
    /// The request failed; the local state was left untouched.
    Failed(String),
}

impl SyncOutcome {
    /// Whether the task completed successfully.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Spawns fire-and-forget server requests.
///
/// Cheaply cloneable; clones share the pending counter.
#[derive(Clone, Default)]
pub struct SyncQueue {
    pending: Arc<AtomicUsize>,
}

impl SyncQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks submitted but not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Submit a one-shot task.
    ///
    /// The task is spawned immediately and runs to completion regardless of
    /// what the submitter does afterwards. `on_done` receives the outcome
    /// exactly once; failures are additionally logged at warn.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F, E, C>(&self, label: &'static str, task: F, on_done: C)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display,
        C: FnOnce(SyncOutcome) + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let outcome = match task.await {
                Ok(()) => SyncOutcome::Completed,
                Err(e) => {
                    tracing::warn!(label, error = %e, "Background sync failed");
                    SyncOutcome::Failed(e.to_string())
                }
            };
            pending.fetch_sub(1, Ordering::SeqCst);
            on_done(outcome);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn outcomes() -> (Arc<Mutex<Vec<SyncOutcome>>>, impl Fn(SyncOutcome) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |outcome| sink.lock().unwrap().push(outcome))
    }

    #[tokio::test]
    async fn test_success_reaches_callback_once() {
        let queue = SyncQueue::new();
        let (seen, on_done) = outcomes();

        queue.submit("test", async { Ok::<(), String>(()) }, on_done);

        // Let the spawned task run.
        tokio::task::yield_now().await;
        while queue.pending() > 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(*seen.lock().unwrap(), vec![SyncOutcome::Completed]);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let queue = SyncQueue::new();
        let (seen, on_done) = outcomes();

        queue.submit("test", async { Err::<(), _>("boom".to_string()) }, on_done);

        tokio::task::yield_now().await;
        while queue.pending() > 0 {
            tokio::task::yield_now().await;
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(&seen[0], SyncOutcome::Failed(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_pending_counts_in_flight_tasks() {
        let queue = SyncQueue::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        queue.submit(
            "test",
            async move {
                let _ = rx.await;
                Ok::<(), String>(())
            },
            |_| {},
        );

        tokio::task::yield_now().await;
        assert_eq!(queue.pending(), 1);

        tx.send(()).unwrap();
        while queue.pending() > 0 {
            tokio::task::yield_now().await;
        }
    }
}
