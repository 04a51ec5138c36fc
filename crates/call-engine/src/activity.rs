//! Time of the last confirmed conversational progress

use std::time::Duration;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Shared "last activity" timestamp.
///
/// The orchestrator touches it after a successful greeting or reply; the
/// silence watchdog reads it. The stored instant never moves backward.
#[derive(Debug)]
pub struct ActivityClock {
    last_activity: Mutex<Instant>,
}

impl ActivityClock {
    /// Start the clock at the current instant
    pub fn new() -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Record activity now
    pub fn touch(&self) {
        let now = Instant::now();
        let mut last = self.last_activity.lock();
        if now > *last {
            *last = now;
        }
    }

    /// Instant of the last recorded activity
    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Time since the last recorded activity
    pub fn elapsed_since(&self) -> Duration {
        self.last_activity().elapsed()
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_tracks_paused_time() {
        let clock = ActivityClock::new();
        tokio::time::advance(Duration::from_secs(12)).await;
        assert_eq!(clock.elapsed_since(), Duration::from_secs(12));

        clock.touch();
        assert_eq!(clock.elapsed_since(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_is_monotonic() {
        let clock = ActivityClock::new();
        let first = clock.last_activity();
        tokio::time::advance(Duration::from_secs(3)).await;
        clock.touch();
        let second = clock.last_activity();
        assert!(second > first);

        // Touching again at the same instant keeps the stored value
        clock.touch();
        assert_eq!(clock.last_activity(), second);
    }
}
