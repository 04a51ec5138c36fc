//! Dead-air detection
//!
//! The watchdog wakes every poll interval and compares the time since the
//! last conversational progress with the silence threshold. The first time
//! the threshold is reached it runs its timeout action once and stops for
//! good. It has no other way to stop, so the orchestrator keeps the
//! [`WatchdogHandle`] and cancels it when the call is over.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use outdial_infra_common::tasks::CancellableTask;

use crate::activity::ActivityClock;
use crate::config::WatchdogConfig;

/// Polls an [`ActivityClock`] for silence
#[derive(Debug, Clone)]
pub struct SilenceWatchdog {
    clock: Arc<ActivityClock>,
    threshold: Duration,
    poll_interval: Duration,
}

impl SilenceWatchdog {
    pub fn new(clock: Arc<ActivityClock>, config: &WatchdogConfig) -> Self {
        Self {
            clock,
            threshold: config.silence_threshold,
            poll_interval: config.poll_interval,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Poll until silence reaches the threshold, then run `on_timeout` once
    pub async fn run<F, Fut>(self, on_timeout: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let silent_for = self.clock.elapsed_since();
            if silent_for >= self.threshold {
                warn!(
                    "🔇 No conversational progress for {:?} (threshold {:?})",
                    silent_for, self.threshold
                );
                on_timeout().await;
                return;
            }
            debug!("Watchdog tick: silent for {:?}", silent_for);
        }
    }

    /// Run the watchdog as a background task owned by the returned handle
    pub fn spawn<F, Fut>(self, name: impl Into<String>, on_timeout: F) -> WatchdogHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        WatchdogHandle {
            task: CancellableTask::spawn(name, self.run(on_timeout)),
        }
    }
}

/// Owner's handle on a running watchdog. Dropping it cancels the watchdog.
#[derive(Debug)]
pub struct WatchdogHandle {
    task: CancellableTask<()>,
}

impl WatchdogHandle {
    /// Still polling: neither fired nor cancelled
    pub fn is_running(&self) -> bool {
        !self.task.is_finished() && !self.task.is_cancelled()
    }

    /// Stop the watchdog without waiting for it
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Stop the watchdog and wait for it. Returns `true` if it had fired.
    pub async fn shutdown(self) -> bool {
        match self.task.shutdown().await {
            Ok(fired) => fired.is_some(),
            Err(e) => {
                warn!("Watchdog did not stop cleanly: {}", e);
                false
            }
        }
    }
}
