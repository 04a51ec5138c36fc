//! Fallback transfer of the call to a human
//!
//! One [`TransferCoordinator`] exists per call session and is shared by the
//! orchestrator and the silence watchdog. Whichever of them asks first gets
//! the single physical transfer; every later request is refused, whether or
//! not the first one succeeded against the telephony API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::TransferConfig;
use crate::phone::{identity_for, UNKNOWN_IDENTITY};
use crate::telephony::{Participant, Telephony};

/// Reason used when the greeting could not be delivered
pub const REASON_GREETING_FAILED: &str = "greeting_failed";

/// Reason used when the follow-up reply could not be generated
pub const REASON_REPLY_FAILED: &str = "llm_reply_failed";

/// Reason used when neither the greeting nor the reply got through
pub const REASON_BOTH_FAILED: &str = "both_greeting_and_reply_failed";

/// Reason used by the silence watchdog
pub fn silence_reason(threshold_secs: u64) -> String {
    format!("silence>{}s", threshold_secs)
}

/// A transfer about to be issued. `reason` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Destination as configured, before formatting
    pub destination: String,
    /// Participant whose leg is handed over
    pub participant_identity: String,
    /// Why the transfer was requested
    pub reason: String,
}

/// Whether the session's one transfer has been used, and how it went
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub attempted: bool,
    pub succeeded: bool,
}

/// Turn a configured destination into a SIP or tel URI.
///
/// - anything with `@` is a SIP address and only gains a missing `sip:` prefix
/// - with a SIP domain, any `tel:`/`sip:` scheme is stripped and the number is
///   rebuilt as `sip:{number}@{domain}`
/// - otherwise a bare number becomes `tel:{number}`
pub fn format_destination(raw: &str, sip_domain: Option<&str>) -> String {
    if raw.contains('@') {
        return if raw.starts_with("sip:") {
            raw.to_string()
        } else {
            format!("sip:{}", raw)
        };
    }

    if let Some(domain) = sip_domain {
        let number = raw.replace("tel:", "").replace("sip:", "");
        return format!("sip:{}@{}", number, domain);
    }

    if raw.starts_with("tel:") || raw.starts_with("sip:") {
        raw.to_string()
    } else {
        format!("tel:{}", raw)
    }
}

/// First participant by join time, ties broken by identity
fn first_by_join_order(mut participants: Vec<Participant>) -> Option<Participant> {
    participants.sort_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    participants.into_iter().find(|p| !p.identity.is_empty())
}

/// Session-scoped, at-most-once transfer
pub struct TransferCoordinator {
    config: TransferConfig,
    telephony: Arc<dyn Telephony>,
    attempted: AtomicBool,
    succeeded: AtomicBool,
    executed: Mutex<Option<TransferRequest>>,
    handed_over: CancellationToken,
}

impl TransferCoordinator {
    pub fn new(config: TransferConfig, telephony: Arc<dyn Telephony>) -> Self {
        Self {
            config,
            telephony,
            attempted: AtomicBool::new(false),
            succeeded: AtomicBool::new(false),
            executed: Mutex::new(None),
            handed_over: CancellationToken::new(),
        }
    }

    /// Cancelled once a transfer has been accepted and the agent must stop talking
    pub fn handed_over(&self) -> CancellationToken {
        self.handed_over.clone()
    }

    /// Current state of the session's transfer
    pub fn outcome(&self) -> TransferOutcome {
        TransferOutcome {
            attempted: self.attempted.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
        }
    }

    /// The request that was actually sent to the telephony API, if any
    pub fn executed_request(&self) -> Option<TransferRequest> {
        self.executed.lock().clone()
    }

    /// Transfer the caller to the configured destination.
    ///
    /// Returns `true` only when this call issued the transfer and the
    /// telephony API accepted it. Disabled transfers, a missing destination,
    /// an unresolvable participant, an earlier attempt and API failures all
    /// return `false`.
    pub async fn transfer(&self, phone_hint: Option<&str>, reason: &str) -> bool {
        if !self.config.enabled {
            warn!("Auto-transfer disabled. Reason={}", reason);
            return false;
        }

        let Some(raw_destination) = self.config.destination.clone() else {
            error!("Auto-transfer failed: DEFAULT_TRANSFER_NUMBER is missing. Reason={}", reason);
            return false;
        };

        if self.attempted.load(Ordering::SeqCst) {
            info!("Auto-transfer already attempted for this call, ignoring Reason={}", reason);
            return false;
        }

        let Some(participant_identity) = self.resolve_identity(phone_hint).await else {
            error!("Auto-transfer failed: participant identity not found. Reason={}", reason);
            return false;
        };

        let destination = format_destination(&raw_destination, self.config.sip_domain.as_deref());

        // Test-and-set: only the first caller past this point reaches the API
        if self.attempted.swap(true, Ordering::SeqCst) {
            info!("Auto-transfer already attempted for this call, ignoring Reason={}", reason);
            return false;
        }

        *self.executed.lock() = Some(TransferRequest {
            destination: raw_destination,
            participant_identity: participant_identity.clone(),
            reason: reason.to_string(),
        });

        warn!(
            "🔀 Auto-transfer triggered. Reason={}, participant={}, destination={}",
            reason, participant_identity, destination
        );

        match self
            .telephony
            .transfer_participant(&participant_identity, &destination)
            .await
        {
            Ok(()) => {
                info!("✅ Transfer to {} accepted", destination);
                self.succeeded.store(true, Ordering::SeqCst);
                self.handed_over.cancel();
                true
            }
            Err(e) => {
                error!("Auto-transfer failed: {}", e);
                false
            }
        }
    }

    async fn resolve_identity(&self, phone_hint: Option<&str>) -> Option<String> {
        let identity = identity_for(phone_hint.unwrap_or_default());
        if identity != UNKNOWN_IDENTITY {
            return Some(identity);
        }

        match self.telephony.remote_participants().await {
            Ok(participants) => first_by_join_order(participants).map(|p| p.identity),
            Err(e) => {
                error!("Could not list participants in {}: {}", self.telephony.room_name(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallEngineError, Result};
    use crate::telephony::DialRequest;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeTelephony {
        participants: Vec<Participant>,
        fail_transfer: bool,
        transfer_delay: Duration,
        transfers: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Telephony for FakeTelephony {
        fn room_name(&self) -> &str {
            "call-test"
        }

        async fn dial(&self, request: DialRequest) -> Result<Participant> {
            Ok(Participant::new(request.participant_identity, 0))
        }

        async fn transfer_participant(&self, identity: &str, destination: &str) -> Result<()> {
            self.transfers
                .lock()
                .push((identity.to_string(), destination.to_string()));
            tokio::time::sleep(self.transfer_delay).await;
            if self.fail_transfer {
                Err(CallEngineError::api("unavailable", "trunk rejected REFER"))
            } else {
                Ok(())
            }
        }

        async fn remote_participants(&self) -> Result<Vec<Participant>> {
            Ok(self.participants.clone())
        }
    }

    fn enabled_config() -> TransferConfig {
        TransferConfig {
            enabled: true,
            destination: Some("+918000000000".to_string()),
            sip_domain: None,
        }
    }

    #[test]
    fn test_format_destination() {
        assert_eq!(format_destination("agent@pbx.example", None), "sip:agent@pbx.example");
        assert_eq!(format_destination("sip:agent@pbx.example", Some("x")), "sip:agent@pbx.example");
        assert_eq!(
            format_destination("tel:+918000000000", Some("sip.vobiz.example")),
            "sip:+918000000000@sip.vobiz.example"
        );
        assert_eq!(format_destination("+918000000000", None), "tel:+918000000000");
        assert_eq!(format_destination("tel:+918000000000", None), "tel:+918000000000");
        assert_eq!(format_destination("sip:1001", None), "sip:1001");
    }

    #[test]
    fn test_silence_reason() {
        assert_eq!(silence_reason(60), "silence>60s");
    }

    #[tokio::test]
    async fn test_disabled_transfer_is_noop() {
        let telephony = Arc::new(FakeTelephony::default());
        let config = TransferConfig {
            enabled: false,
            ..enabled_config()
        };
        let coordinator = TransferCoordinator::new(config, telephony.clone());

        assert!(!coordinator.transfer(Some("+919876543210"), REASON_GREETING_FAILED).await);
        assert!(telephony.transfers.lock().is_empty());
        assert_eq!(coordinator.outcome(), TransferOutcome::default());
    }

    #[tokio::test]
    async fn test_missing_destination_is_noop() {
        let telephony = Arc::new(FakeTelephony::default());
        let config = TransferConfig {
            destination: None,
            ..enabled_config()
        };
        let coordinator = TransferCoordinator::new(config, telephony.clone());

        assert!(!coordinator.transfer(Some("+919876543210"), REASON_GREETING_FAILED).await);
        assert!(!coordinator.outcome().attempted);
    }

    #[tokio::test]
    async fn test_identity_from_phone_hint() {
        let telephony = Arc::new(FakeTelephony::default());
        let coordinator = TransferCoordinator::new(enabled_config(), telephony.clone());

        assert!(coordinator.transfer(Some("+919876543210"), REASON_GREETING_FAILED).await);
        assert_eq!(
            telephony.transfers.lock().as_slice(),
            &[("sip_919876543210".to_string(), "tel:+918000000000".to_string())]
        );
        assert_eq!(
            coordinator.outcome(),
            TransferOutcome {
                attempted: true,
                succeeded: true
            }
        );
        assert_eq!(coordinator.executed_request().unwrap().reason, REASON_GREETING_FAILED);
        assert!(coordinator.handed_over().is_cancelled());
    }

    #[tokio::test]
    async fn test_identity_falls_back_to_earliest_participant() {
        let telephony = Arc::new(FakeTelephony {
            participants: vec![
                Participant::new("web-visitor", 1_700_000_050),
                Participant::new("sip_b", 1_700_000_010),
                Participant::new("sip_a", 1_700_000_010),
            ],
            ..Default::default()
        });
        let coordinator = TransferCoordinator::new(enabled_config(), telephony.clone());

        assert!(coordinator.transfer(None, "silence>60s").await);
        assert_eq!(telephony.transfers.lock()[0].0, "sip_a");
    }

    #[tokio::test]
    async fn test_no_resolvable_identity_fails_without_using_the_attempt() {
        let telephony = Arc::new(FakeTelephony::default());
        let coordinator = TransferCoordinator::new(enabled_config(), telephony.clone());

        assert!(!coordinator.transfer(Some(""), REASON_REPLY_FAILED).await);
        assert!(telephony.transfers.lock().is_empty());
        assert!(!coordinator.outcome().attempted);
    }

    #[tokio::test]
    async fn test_failed_attempt_still_blocks_later_transfers() {
        let telephony = Arc::new(FakeTelephony {
            fail_transfer: true,
            ..Default::default()
        });
        let coordinator = TransferCoordinator::new(enabled_config(), telephony.clone());

        assert!(!coordinator.transfer(Some("+919876543210"), REASON_GREETING_FAILED).await);
        assert!(!coordinator.transfer(Some("+919876543210"), REASON_BOTH_FAILED).await);

        assert_eq!(telephony.transfers.lock().len(), 1);
        assert_eq!(
            coordinator.outcome(),
            TransferOutcome {
                attempted: true,
                succeeded: false
            }
        );
        assert!(!coordinator.handed_over().is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_issue_one_transfer() {
        let telephony = Arc::new(FakeTelephony {
            transfer_delay: Duration::from_millis(20),
            ..Default::default()
        });
        let coordinator = Arc::new(TransferCoordinator::new(enabled_config(), telephony.clone()));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let coordinator = coordinator.clone();
            let reason = if i % 2 == 0 {
                REASON_GREETING_FAILED.to_string()
            } else {
                silence_reason(60)
            };
            tasks.push(tokio::spawn(async move {
                coordinator.transfer(Some("+919876543210"), &reason).await
            }));
        }

        let mut wins = 0;
        for task in tasks {
            if task.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(telephony.transfers.lock().len(), 1);
    }
}
