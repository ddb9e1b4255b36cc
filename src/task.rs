//! Abort-on-drop guard for spawned tasks.
//!
//! Periodic work (the elapsed-time ticker, the progress estimator) must stop
//! on every exit path of its owner, including early returns and errors.
//! [`TaskGuard`] ties the task's lifetime to a value: dropping the guard
//! aborts the task, so scoped ownership is the cancellation mechanism.

use std::future::Future;

use tokio::task::JoinHandle;

/// Owns a spawned task and aborts it when dropped.
#[derive(Debug)]
pub(crate) struct TaskGuard {
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Spawn `fut` on the current runtime and tie it to the returned guard.
    pub(crate) fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(fut)),
        }
    }

    /// Wait for the task to finish on its own instead of aborting it.
    ///
    /// Used when the task has a natural end (e.g. draining a channel that is
    /// about to close) and its remaining work must complete first.
    pub(crate) async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
