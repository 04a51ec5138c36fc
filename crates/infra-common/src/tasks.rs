//! Cancellable background tasks
//!
//! A [`CancellableTask`] wraps a spawned future together with the
//! [`CancellationToken`] that stops it, so the owner can cancel and join the
//! task when it tears down instead of leaking it. Dropping the handle cancels
//! the task.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::types::{Error, Result};

/// Handle to a spawned task that stops when cancelled or dropped
#[derive(Debug)]
pub struct CancellableTask<T> {
    name: String,
    handle: Option<JoinHandle<Option<T>>>,
    cancel_token: CancellationToken,
    started_at: Instant,
}

impl<T: Send + 'static> CancellableTask<T> {
    /// Spawn `future` on the current runtime.
    ///
    /// The task resolves to `Some(output)` when the future completes and to
    /// `None` when it was cancelled first.
    pub fn spawn<F>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let name = name.into();
        let cancel_token = CancellationToken::new();
        let child_token = cancel_token.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            debug!("Task started: {}", task_name);
            tokio::select! {
                output = future => {
                    debug!("Task completed: {}", task_name);
                    Some(output)
                }
                _ = child_token.cancelled() => {
                    debug!("Task cancelled: {}", task_name);
                    None
                }
            }
        });

        Self {
            name,
            handle: Some(handle),
            cancel_token,
            started_at: Instant::now(),
        }
    }
}

impl<T> CancellableTask<T> {
    /// Get task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if task is finished
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Whether [`cancel`](Self::cancel) has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Request cancellation without waiting for the task to stop
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Get task runtime
    pub fn runtime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Wait for the task to stop on its own or by cancellation
    pub async fn join(mut self) -> Result<Option<T>> {
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| Error::Task(format!("{}: {}", self.name, e))),
            None => Ok(None),
        }
    }

    /// Cancel the task and wait for it to stop
    pub async fn shutdown(self) -> Result<Option<T>> {
        self.cancel();
        self.join().await
    }
}

impl<T> Drop for CancellableTask<T> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_task_yields_output() {
        let task = CancellableTask::spawn("answer", async { 42 });
        assert_eq!(task.name(), "answer");
        assert_eq!(task.join().await.unwrap(), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_long_task() {
        let task = CancellableTask::spawn("sleeper", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            "woke"
        });
        assert!(!task.is_cancelled());
        assert_eq!(task.shutdown().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = CancellableTask::spawn("guarded", async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let _ = tx.send(());
        });
        drop(task);
        // The sender is dropped unsent once the select! takes the cancel branch
        assert!(rx.await.is_err());
    }
}
