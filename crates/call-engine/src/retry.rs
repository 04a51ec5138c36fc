//! Bounded retry with a per-attempt timeout
//!
//! Every speech and language-model action goes through [`RetryingExecutor`].
//! An attempt that errors or runs past its deadline is retried back to back
//! with no backoff; once the attempts are spent the executor reports `false`
//! and the caller decides what to do. Provider errors never propagate past
//! this point.
//!
//! An executor can be given an abort token. Once it is cancelled the attempt
//! in flight is dropped and no further attempt starts.

use std::future::Future;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{CallEngineError, Result};

/// Default deadline for a single attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Timeout and attempt budget for one kind of action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Deadline applied to each attempt separately
    pub timeout: Duration,
    /// Total attempts, including the first
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS)
    }
}

/// Runs an action under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryingExecutor {
    label: String,
    policy: RetryPolicy,
    abort: CancellationToken,
}

impl RetryingExecutor {
    /// `label` names the action in logs, e.g. `"greeting"`
    pub fn new(label: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            label: label.into(),
            policy,
            abort: CancellationToken::new(),
        }
    }

    /// Stop retrying, and drop the attempt in flight, once `token` is cancelled
    pub fn with_abort(mut self, token: CancellationToken) -> Self {
        self.abort = token;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `action` until one attempt succeeds within the deadline.
    ///
    /// Returns `true` on the first clean attempt and `false` once
    /// `max_attempts` have failed or timed out, or the executor was aborted.
    /// Never returns an error.
    pub async fn run<F, Fut>(&self, mut action: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        for attempt in 1..=self.policy.max_attempts {
            if self.abort.is_cancelled() {
                warn!("⏹️ {}: aborted before attempt {}", self.label, attempt);
                return false;
            }
            info!("🔁 {}: start (attempt {}/{})", self.label, attempt, self.policy.max_attempts);

            let outcome = tokio::select! {
                biased;
                _ = self.abort.cancelled() => {
                    warn!("⏹️ {}: aborted during attempt {}", self.label, attempt);
                    return false;
                }
                result = tokio::time::timeout(self.policy.timeout, action()) => match result {
                    Ok(result) => result,
                    Err(_) => Err(CallEngineError::ProviderTimeout(self.policy.timeout)),
                },
            };

            match outcome {
                Ok(()) => {
                    info!("✅ {}: completed on attempt {}", self.label, attempt);
                    return true;
                }
                Err(e) => {
                    error!("❌ {} failed (attempt {}): {}", self.label, attempt, e);
                }
            }
        }

        error!("💥 {}: giving up after {} attempts", self.label, self.policy.max_attempts);
        false
    }
}
