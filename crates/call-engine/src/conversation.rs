//! The speech pipeline the orchestrator drives
//!
//! A [`ConversationSession`] is the speech-to-text, language-model and
//! text-to-speech stack attached to the call room. Which providers back it is
//! decided elsewhere; the orchestrator only needs these three operations.

use async_trait::async_trait;

use crate::error::Result;

/// Live conversation attached to a call room
#[async_trait]
pub trait ConversationSession: Send + Sync {
    /// Join the room with the given system instructions
    async fn start(&self, instructions: &str) -> Result<()>;

    /// Speak fixed text and resolve once playout has finished
    async fn say(&self, text: &str) -> Result<()>;

    /// Generate and speak one model turn guided by `instructions`
    async fn generate_reply(&self, instructions: &str) -> Result<()>;
}
