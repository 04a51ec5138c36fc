use std::fmt;

use crate::error::{CallEngineError, Result};

/// Logical state of one call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Room joined, conversation session starting
    Connecting,

    /// Outbound leg being placed, waiting for the callee to answer
    Dialing,

    /// Callee picked up
    Answered,

    /// Opening line being spoken
    Greeting,

    /// First model-generated turn being produced
    FollowingUp,

    /// Inbound or web call handed to the live conversation
    Active,

    /// Caller handed to a human
    Transferred,

    /// Outbound call handed to the live conversation, watchdog still guarding
    Ended,

    /// The outbound leg was never established
    Failed,
}

impl CallState {
    /// No transitions leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Active | Self::Transferred | Self::Ended | Self::Failed)
    }

    /// Check if a state transition is valid
    pub fn can_transition_to(&self, to: CallState) -> bool {
        use CallState::*;

        match (self, to) {
            // From Connecting: dial out, or go straight to the inbound greeting
            (Connecting, Dialing) => true,
            (Connecting, Greeting) => true,

            // From Dialing
            (Dialing, Answered) => true,
            (Dialing, Failed) => true,

            // From Answered
            (Answered, Greeting) => true,

            // From Greeting
            (Greeting, FollowingUp) => true,
            (Greeting, Transferred) => true,

            // From FollowingUp
            (FollowingUp, Active) => true,
            (FollowingUp, Ended) => true,
            (FollowingUp, Transferred) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Validate `self -> to`
    pub fn transition_to(self, to: CallState) -> Result<CallState> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CallEngineError::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the opening of the call achieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOutcome {
    /// The greeting was spoken
    pub greeted: bool,
    /// The follow-up reply was generated
    pub replied: bool,
    /// The call was handed to a human
    pub transferred: bool,
}

impl CallOutcome {
    /// Neither the greeting nor the reply got through
    pub fn is_silent(&self) -> bool {
        !self.greeted && !self.replied
    }
}
