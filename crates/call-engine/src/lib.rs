//! # outdial call engine
//!
//! Outbound voice calls driven by an AI agent: dial a number through a SIP
//! trunk, greet the callee as soon as they pick up, keep the conversation
//! moving, and hand the caller to a human when the speech pipeline fails or
//! the line goes quiet.
//!
//! ## Architecture
//!
//! ```text
//!  outdial call --to N ──► CallDispatcher ──► room + agent job
//!                                                   │
//!                                                   ▼
//!                                   CallSessionOrchestrator::run(job)
//!                                    │         │            │
//!                       RetryingExecutor  SilenceWatchdog  TransferCoordinator
//!                                    │         │            │
//!                           ConversationSession  ActivityClock  Telephony
//! ```
//!
//! The speech and language-model stack sits behind [`ConversationSession`]
//! and the telephony server behind [`Telephony`], so the orchestration runs
//! the same against LiveKit ([`livekit::LiveKitTelephony`]) or a test fake.
//!
//! ## Failure handling
//!
//! - every provider action is bounded by a per-attempt timeout and retried
//!   once ([`retry`])
//! - a failed stage or prolonged silence triggers a transfer to the
//!   configured human destination ([`transfer`], [`watchdog`])
//! - a session issues at most one transfer, whoever asks first

pub mod activity;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod livekit;
pub mod orchestrator;
pub mod phone;
pub mod prompts;
pub mod retry;
pub mod telephony;
pub mod transfer;
pub mod trunk;
pub mod watchdog;

pub use activity::ActivityClock;
pub use config::AgentConfig;
pub use conversation::ConversationSession;
pub use dispatch::{CallDispatcher, DispatchApi, DispatchError, DispatchReceipt};
pub use error::{CallEngineError, Result};
pub use orchestrator::{CallJob, CallOutcome, CallSession, CallSessionOrchestrator, CallState};
pub use retry::{RetryPolicy, RetryingExecutor};
pub use telephony::{DialRequest, Participant, Telephony};
pub use transfer::{TransferCoordinator, TransferOutcome, TransferRequest};
pub use watchdog::{SilenceWatchdog, WatchdogHandle};

/// Handle one agent job in a LiveKit room.
///
/// The worker that receives jobs and owns the speech pipeline calls this
/// with the room it joined, the job metadata and its conversation session.
pub async fn run_job(
    config: AgentConfig,
    room_name: &str,
    metadata: Option<String>,
    conversation: std::sync::Arc<dyn ConversationSession>,
) -> Result<CallSession> {
    config.validate_runtime()?;
    let orchestrator = CallSessionOrchestrator::for_livekit(config, room_name, conversation)?;
    orchestrator.run(&CallJob::new(room_name, metadata)).await
}

/// Commonly used types
pub mod prelude {
    pub use crate::activity::ActivityClock;
    pub use crate::config::{AgentConfig, LlmProvider, TtsProvider};
    pub use crate::conversation::ConversationSession;
    pub use crate::dispatch::{CallDispatcher, DispatchApi, DispatchError};
    pub use crate::error::{CallEngineError, Result};
    pub use crate::orchestrator::{CallJob, CallOutcome, CallSession, CallSessionOrchestrator, CallState};
    pub use crate::phone::normalize_phone;
    pub use crate::retry::{RetryPolicy, RetryingExecutor};
    pub use crate::run_job;
    pub use crate::telephony::{DialRequest, Participant, Telephony};
    pub use crate::transfer::{TransferCoordinator, TransferOutcome};
}
