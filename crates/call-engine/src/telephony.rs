//! Telephony capabilities the call engine consumes
//!
//! The engine never talks to a SIP stack directly. Dialing, transferring and
//! listing the people in the room all go through [`Telephony`], which is
//! implemented against the LiveKit server API in [`crate::livekit`] and by
//! fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A remote participant in the call room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identity, e.g. `sip_919876543210`
    pub identity: String,
    /// Unix timestamp (seconds) at which the participant joined
    pub joined_at: i64,
}

impl Participant {
    pub fn new(identity: impl Into<String>, joined_at: i64) -> Self {
        Self {
            identity: identity.into(),
            joined_at,
        }
    }
}

/// Request to bring a phone number into the room over the outbound trunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    /// Outbound trunk to dial through
    pub trunk_id: String,
    /// Normalised `+<digits>` number
    pub call_to: String,
    /// Identity the callee gets in the room
    pub participant_identity: String,
    /// Resolve only once the callee picks up
    pub wait_until_answered: bool,
}

/// Telephony operations scoped to one call room
#[async_trait]
pub trait Telephony: Send + Sync {
    /// Name of the room this handle operates on
    fn room_name(&self) -> &str;

    /// Dial out and return the participant that joined
    async fn dial(&self, request: DialRequest) -> Result<Participant>;

    /// Hand a participant's SIP leg over to `destination`
    async fn transfer_participant(&self, identity: &str, destination: &str) -> Result<()>;

    /// Remote participants currently connected, in no particular order
    async fn remote_participants(&self) -> Result<Vec<Participant>>;
}
