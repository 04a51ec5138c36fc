use std::sync::Arc;
use tracing::{debug, info};

use crate::activity::ActivityClock;
use crate::error::Result;
use crate::transfer::{TransferCoordinator, TransferOutcome, TransferRequest};
use crate::watchdog::WatchdogHandle;

use super::state::{CallOutcome, CallState};

/// One conversation, from room connection to a terminal state.
///
/// Owns the activity clock, the transfer guard and the watchdog handle.
/// Dropping the session cancels the watchdog.
pub struct CallSession {
    room_name: String,
    phone_number: Option<String>,
    participant_identity: String,
    state: CallState,
    history: Vec<CallState>,
    outcome: CallOutcome,
    clock: Arc<ActivityClock>,
    transfer: Arc<TransferCoordinator>,
    watchdog: Option<WatchdogHandle>,
}

impl CallSession {
    pub(crate) fn new(
        room_name: String,
        phone_number: Option<String>,
        participant_identity: String,
        transfer: Arc<TransferCoordinator>,
    ) -> Self {
        Self {
            room_name,
            phone_number,
            participant_identity,
            state: CallState::Connecting,
            history: vec![CallState::Connecting],
            outcome: CallOutcome::default(),
            clock: Arc::new(ActivityClock::new()),
            transfer,
            watchdog: None,
        }
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// Normalised number that was dialled, `None` for inbound calls
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    pub fn participant_identity(&self) -> &str {
        &self.participant_identity
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Every state the session went through, oldest first
    pub fn history(&self) -> &[CallState] {
        &self.history
    }

    pub fn outcome(&self) -> CallOutcome {
        self.outcome
    }

    pub fn transfer_outcome(&self) -> TransferOutcome {
        self.transfer.outcome()
    }

    /// The transfer request that reached the telephony API, if any
    pub fn executed_transfer(&self) -> Option<TransferRequest> {
        self.transfer.executed_request()
    }

    pub fn activity_clock(&self) -> &Arc<ActivityClock> {
        &self.clock
    }

    /// Whether the silence watchdog is still guarding the call
    pub fn is_watchdog_running(&self) -> bool {
        self.watchdog.as_ref().is_some_and(|w| w.is_running())
    }

    /// Tear the session down, stopping the watchdog if it is still running
    pub async fn shutdown(mut self) -> CallState {
        if let Some(watchdog) = self.watchdog.take() {
            let fired = watchdog.shutdown().await;
            debug!("Watchdog for {} stopped (fired: {})", self.room_name, fired);
        }
        info!("🛑 Session {} closed in state {}", self.room_name, self.state);
        self.state
    }

    pub(crate) fn transition(&mut self, to: CallState) -> Result<()> {
        let from = self.state;
        self.state = from.transition_to(to)?;
        self.history.push(to);
        info!("🔄 Call {} state: {} → {}", self.room_name, from, to);
        Ok(())
    }

    pub(crate) fn outcome_mut(&mut self) -> &mut CallOutcome {
        &mut self.outcome
    }

    pub(crate) fn transfer_coordinator(&self) -> &Arc<TransferCoordinator> {
        &self.transfer
    }

    pub(crate) fn attach_watchdog(&mut self, watchdog: WatchdogHandle) {
        self.watchdog = Some(watchdog);
    }

    pub(crate) async fn stop_watchdog(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.shutdown().await;
            debug!("Watchdog for {} cancelled", self.room_name);
        }
    }
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("room_name", &self.room_name)
            .field("phone_number", &self.phone_number)
            .field("participant_identity", &self.participant_identity)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("transfer", &self.transfer.outcome())
            .field("watchdog_running", &self.is_watchdog_running())
            .finish()
    }
}
