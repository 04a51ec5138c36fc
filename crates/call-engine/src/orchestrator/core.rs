use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::conversation::ConversationSession;
use crate::error::{CallEngineError, Result};
use crate::livekit::{LiveKitApi, LiveKitTelephony};
use crate::phone::identity_for;
use crate::prompts::{
    agent_instructions, INBOUND_GREETING, INBOUND_REPLY_INSTRUCTIONS,
    OUTBOUND_FOLLOW_UP_INSTRUCTIONS,
};
use crate::retry::RetryingExecutor;
use crate::telephony::{DialRequest, Telephony};
use crate::transfer::{
    silence_reason, TransferCoordinator, REASON_BOTH_FAILED, REASON_GREETING_FAILED,
    REASON_REPLY_FAILED,
};
use crate::watchdog::SilenceWatchdog;

use super::job::CallJob;
use super::session::CallSession;
use super::state::CallState;

/// Drives one call from room connection to a terminal state.
///
/// Outbound: dial and wait for the answer, start the silence watchdog,
/// greet, follow up with a generated reply, and transfer to a human whenever
/// a stage cannot be completed. Inbound: greet and reply once, best effort.
pub struct CallSessionOrchestrator {
    config: AgentConfig,
    telephony: Arc<dyn Telephony>,
    conversation: Arc<dyn ConversationSession>,
    instructions: String,
}

impl CallSessionOrchestrator {
    pub fn new(
        config: AgentConfig,
        telephony: Arc<dyn Telephony>,
        conversation: Arc<dyn ConversationSession>,
    ) -> Self {
        Self {
            config,
            telephony,
            conversation,
            instructions: agent_instructions(None),
        }
    }

    /// Orchestrator that dials and transfers through the LiveKit server
    /// hosting `room_name`
    pub fn for_livekit(
        config: AgentConfig,
        room_name: &str,
        conversation: Arc<dyn ConversationSession>,
    ) -> Result<Self> {
        let api = Arc::new(LiveKitApi::new(&config.livekit)?);
        let telephony = Arc::new(LiveKitTelephony::new(api, room_name));
        Ok(Self::new(config, telephony, conversation))
    }

    /// Add a block of known listings to the agent's instructions
    pub fn with_catalog_brief(mut self, brief: &str) -> Self {
        self.instructions = agent_instructions(Some(brief));
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the job.
    ///
    /// Configuration problems and a conversation session that cannot start
    /// are errors. A failed dial is not: the session comes back in
    /// [`CallState::Failed`] and the caller tears the job down.
    pub async fn run(&self, job: &CallJob) -> Result<CallSession> {
        info!("🚀 Connecting to room: {}", job.room_name);
        self.config.validate_runtime()?;
        self.config.validate()?;

        let phone_number = job.outbound_target();
        let transfer = Arc::new(TransferCoordinator::new(
            self.config.transfer.clone(),
            self.telephony.clone(),
        ));
        let identity = identity_for(phone_number.as_deref().unwrap_or_default());
        let mut session = CallSession::new(job.room_name.clone(), phone_number.clone(), identity, transfer);

        self.conversation.start(&self.instructions).await?;

        match phone_number {
            Some(phone) if self.config.outbound.enabled => {
                self.run_outbound(&mut session, &phone).await?;
            }
            Some(_) => {
                warn!("Outbound calling is disabled by configuration. Skipping SIP dial.");
                self.run_inbound(&mut session).await?;
            }
            None => {
                info!("No phone number in metadata. Treating as inbound/web call.");
                self.run_inbound(&mut session).await?;
            }
        }

        Ok(session)
    }

    async fn run_inbound(&self, session: &mut CallSession) -> Result<()> {
        session.transition(CallState::Greeting)?;
        let greeted = self.speak(session, INBOUND_GREETING).await;
        if greeted {
            session.activity_clock().touch();
        }
        session.outcome_mut().greeted = greeted;

        session.transition(CallState::FollowingUp)?;
        let replied = self.reply(session, INBOUND_REPLY_INSTRUCTIONS).await;
        if replied {
            session.activity_clock().touch();
        }
        session.outcome_mut().replied = replied;

        session.transition(CallState::Active)
    }

    async fn run_outbound(&self, session: &mut CallSession, phone: &str) -> Result<()> {
        let trunk_id = self.config.outbound.trunk_id.clone().ok_or_else(|| {
            CallEngineError::config("OUTBOUND_TRUNK_ID is missing. Set it in .env.local or .env.")
        })?;

        session.transition(CallState::Dialing)?;
        info!("📞 Initiating outbound SIP call to {}...", phone);

        let request = DialRequest {
            trunk_id,
            call_to: phone.to_string(),
            participant_identity: session.participant_identity().to_string(),
            wait_until_answered: true,
        };
        if let Err(e) = self.telephony.dial(request).await {
            error!("❌ Failed to place outbound call: {}", e);
            return session.transition(CallState::Failed);
        }

        session.transition(CallState::Answered)?;
        info!("✅ Call answered! Agent is now listening.");
        session.activity_clock().touch();
        self.start_watchdog(session, phone);

        // Guaranteed greeting on pickup
        session.transition(CallState::Greeting)?;
        let greeted = self.speak(session, &self.config.outbound.greeting).await;
        session.outcome_mut().greeted = greeted;
        if greeted {
            session.activity_clock().touch();
        }
        if session.transfer_outcome().succeeded {
            // The watchdog handed the call over while we were greeting
            return self.finish_transferred(session).await;
        }
        if !greeted && self.transfer(session, phone, REASON_GREETING_FAILED).await {
            return self.finish_transferred(session).await;
        }

        // Keep the conversation moving
        session.transition(CallState::FollowingUp)?;
        tokio::time::sleep(self.config.retry.follow_up_delay).await;
        if session.transfer_outcome().succeeded {
            return self.finish_transferred(session).await;
        }
        let replied = self.reply(session, OUTBOUND_FOLLOW_UP_INSTRUCTIONS).await;
        session.outcome_mut().replied = replied;
        if replied {
            session.activity_clock().touch();
        }
        if session.transfer_outcome().succeeded {
            return self.finish_transferred(session).await;
        }
        if !replied && self.transfer(session, phone, REASON_REPLY_FAILED).await {
            return self.finish_transferred(session).await;
        }

        // Hard fallback when the speech pipeline produced nothing at all
        if session.outcome().is_silent() && self.transfer(session, phone, REASON_BOTH_FAILED).await {
            return self.finish_transferred(session).await;
        }

        if session.transfer_outcome().succeeded {
            return self.finish_transferred(session).await;
        }

        session.transition(CallState::Ended)
    }

    fn start_watchdog(&self, session: &mut CallSession, phone: &str) {
        let watchdog = SilenceWatchdog::new(session.activity_clock().clone(), &self.config.watchdog);
        let reason = silence_reason(watchdog.threshold().as_secs());
        let transfer = session.transfer_coordinator().clone();
        let phone = phone.to_string();
        let name = format!("silence-watchdog-{}", session.room_name());

        let handle = watchdog.spawn(name, move || async move {
            transfer.transfer(Some(&phone), &reason).await;
        });
        session.attach_watchdog(handle);
    }

    async fn finish_transferred(&self, session: &mut CallSession) -> Result<()> {
        session.outcome_mut().transferred = true;
        session.transition(CallState::Transferred)?;
        session.stop_watchdog().await;
        Ok(())
    }

    async fn transfer(&self, session: &CallSession, phone: &str, reason: &str) -> bool {
        session.transfer_coordinator().transfer(Some(phone), reason).await
    }

    /// Speak `text`, giving up as soon as the call has been handed to a human
    async fn speak(&self, session: &CallSession, text: &str) -> bool {
        RetryingExecutor::new("greeting", self.config.retry.speak)
            .with_abort(session.transfer_coordinator().handed_over())
            .run(|| self.conversation.say(text))
            .await
    }

    async fn reply(&self, session: &CallSession, instructions: &str) -> bool {
        RetryingExecutor::new("llm reply", self.config.retry.reply)
            .with_abort(session.transfer_coordinator().handed_over())
            .run(|| self.conversation.generate_reply(instructions))
            .await
    }
}
