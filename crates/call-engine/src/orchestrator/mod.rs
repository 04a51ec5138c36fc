//! # Call Session Orchestration
//!
//! Everything that happens between an agent job arriving and the call
//! settling into a terminal state.
//!
//! ## Module Organization
//!
//! - **[`job`]**: the job as delivered by the dispatcher and its metadata
//! - **[`state`]**: call states, the allowed transitions and the per-call outcome
//! - **[`session`]**: one live call with its activity clock, transfer guard and watchdog
//! - **[`core`]**: [`CallSessionOrchestrator`], which drives a session through the flow
//!
//! ## Outbound flow
//!
//! ```text
//! Connecting → Dialing → Answered → Greeting → FollowingUp → Ended
//!                 │                     │            │
//!                 ▼                     └────────────┴──→ Transferred
//!               Failed
//! ```
//!
//! The silence watchdog starts once the callee answers and shares the
//! session's transfer guard, so at most one transfer is ever issued no
//! matter which side asks first.
//!
//! ## Inbound flow
//!
//! `Connecting → Greeting → FollowingUp → Active`, one greeting and one reply,
//! best effort, with neither watchdog nor transfer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use outdial_call_engine::prelude::*;
//!
//! # async fn example(
//! #     telephony: Arc<dyn Telephony>,
//! #     conversation: Arc<dyn ConversationSession>,
//! # ) -> Result<()> {
//! let config = AgentConfig::from_env()?;
//! let orchestrator = CallSessionOrchestrator::new(config, telephony, conversation);
//!
//! let job = CallJob::new("call-919876543210-4821", Some(r#"{"phone_number":"+919876543210"}"#.to_string()));
//! let session = orchestrator.run(&job).await?;
//! println!("call ended in {}", session.state());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod job;
pub mod session;
pub mod state;

pub use self::core::CallSessionOrchestrator;
pub use job::{CallJob, JobMetadata};
pub use session::CallSession;
pub use state::{CallOutcome, CallState};
