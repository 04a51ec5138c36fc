//! LiveKit server API
//!
//! A small Twirp JSON client covering the room, agent dispatch and SIP
//! calls the agent and the dispatch tool need. [`LiveKitTelephony`] binds it
//! to a single call room.

pub mod client;
pub mod token;
pub mod types;

pub use client::{http_url, LiveKitApi, LiveKitTelephony};
pub use token::{AccessClaims, AccessToken, SipGrants, VideoGrants};
pub use types::*;
