//! Outbound call dispatch
//!
//! Creates a fresh room for the call and asks the server to send the
//! outbound agent into it, with the number to dial in the job metadata.
//! The agent does the dialing; dispatch returns as soon as the job is queued.

use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::error::{CallEngineError, Result};
use crate::livekit::AgentDispatch;
use crate::phone::{digits_only, normalize_phone};

/// Seconds an empty call room lingers before the server closes it
pub const ROOM_EMPTY_TIMEOUT: Duration = Duration::from_secs(300);

/// Participant cap for a call room
pub const ROOM_MAX_PARTICIPANTS: u32 = 10;

/// Room to create for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRequest {
    pub name: String,
    pub empty_timeout: Duration,
    pub max_participants: u32,
}

/// Agent job to queue in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub agent_name: String,
    pub room: String,
    /// JSON job metadata, `{"phone_number": "+<digits>"}`
    pub metadata: String,
}

#[derive(Serialize)]
struct DispatchMetadata<'a> {
    phone_number: &'a str,
}

/// Server operations needed to dispatch a call
#[async_trait]
pub trait DispatchApi: Send + Sync {
    async fn create_room(&self, request: &RoomRequest) -> Result<()>;
    async fn create_dispatch(&self, request: &DispatchRequest) -> Result<AgentDispatch>;
}

/// Why a dispatch did not happen
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Outbound calling is disabled. Set ENABLE_OUTBOUND_CALLS=true to allow calls.")]
    Disabled,

    #[error("phone number is empty after normalization")]
    InvalidNumber,

    #[error("{0}")]
    MissingConfig(String),

    #[error("Error dispatching call: {0}")]
    Api(#[from] CallEngineError),
}

impl DispatchError {
    /// Process exit status, following the sysexits convention
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Disabled | Self::MissingConfig(_) => 78,
            Self::InvalidNumber => 65,
            Self::Api(_) => 69,
        }
    }
}

/// A queued call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub phone_number: String,
    pub room_name: String,
    pub dispatch_id: String,
    pub agent_name: String,
}

/// Room name for a call to `phone`: `call-<digits>-<NNNN>`
pub fn room_name_for(phone: &str, suffix: u16) -> String {
    format!("call-{}-{}", digits_only(phone), suffix)
}

fn random_suffix() -> u16 {
    rand::thread_rng().gen_range(1000..=9999)
}

/// Places outbound calls by dispatching the agent
pub struct CallDispatcher<A: DispatchApi> {
    config: AgentConfig,
    api: A,
}

impl<A: DispatchApi> CallDispatcher<A> {
    pub fn new(config: AgentConfig, api: A) -> Self {
        Self { config, api }
    }

    /// Check everything that can be checked without touching the server
    pub fn prepare(&self, to: &str) -> std::result::Result<String, DispatchError> {
        if !self.config.outbound.enabled {
            return Err(DispatchError::Disabled);
        }

        let phone_number = normalize_phone(to.trim());
        if phone_number.is_empty() {
            return Err(DispatchError::InvalidNumber);
        }

        if !self.config.livekit.is_complete() {
            return Err(DispatchError::MissingConfig(
                "LiveKit credentials missing in .env.local".to_string(),
            ));
        }
        if self.config.outbound.trunk_id.is_none() {
            return Err(DispatchError::MissingConfig(
                "OUTBOUND_TRUNK_ID missing. Run setup and set it in .env.local/.env.".to_string(),
            ));
        }
        if self.config.outbound.sip_domain.is_none() {
            return Err(DispatchError::MissingConfig(
                "VOBIZ_SIP_DOMAIN missing in .env.local/.env.".to_string(),
            ));
        }

        Ok(phone_number)
    }

    /// Create the call room and dispatch the agent to dial `to`
    pub async fn dispatch(&self, to: &str) -> std::result::Result<DispatchReceipt, DispatchError> {
        let phone_number = self.prepare(to)?;
        let room_name = room_name_for(&phone_number, random_suffix());

        info!("📞 Initiating call to {}...", phone_number);
        info!("Session Room: {}", room_name);

        let room = RoomRequest {
            name: room_name.clone(),
            empty_timeout: ROOM_EMPTY_TIMEOUT,
            max_participants: ROOM_MAX_PARTICIPANTS,
        };
        match self.api.create_room(&room).await {
            Ok(()) => info!("Room ready: {}", room_name),
            Err(e) if e.is_already_exists() => warn!("Room already exists: {}", room_name),
            Err(e) => {
                error!("❌ Could not create room {}: {}", room_name, e);
                return Err(e.into());
            }
        }

        let metadata = serde_json::to_string(&DispatchMetadata {
            phone_number: &phone_number,
        })
        .map_err(CallEngineError::from)?;
        let request = DispatchRequest {
            agent_name: self.config.outbound.agent_name.clone(),
            room: room_name.clone(),
            metadata,
        };
        let dispatch = self.api.create_dispatch(&request).await?;

        info!("✅ Call dispatched successfully. Dispatch ID: {}", dispatch.id);
        Ok(DispatchReceipt {
            phone_number,
            room_name,
            dispatch_id: dispatch.id,
            agent_name: if dispatch.agent_name.is_empty() {
                request.agent_name
            } else {
                dispatch.agent_name
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeApi {
        room_error: Option<(&'static str, &'static str)>,
        fail_dispatch: bool,
        rooms: Mutex<Vec<RoomRequest>>,
        dispatches: Mutex<Vec<DispatchRequest>>,
    }

    #[async_trait]
    impl DispatchApi for FakeApi {
        async fn create_room(&self, request: &RoomRequest) -> Result<()> {
            self.rooms.lock().push(request.clone());
            match self.room_error {
                Some((code, msg)) => Err(CallEngineError::api(code, msg)),
                None => Ok(()),
            }
        }

        async fn create_dispatch(&self, request: &DispatchRequest) -> Result<AgentDispatch> {
            self.dispatches.lock().push(request.clone());
            if self.fail_dispatch {
                return Err(CallEngineError::api("unavailable", "no workers"));
            }
            Ok(AgentDispatch {
                id: "AD_test".to_string(),
                agent_name: request.agent_name.clone(),
                room: request.room.clone(),
            })
        }
    }

    fn ready_config() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.outbound.enabled = true;
        config.outbound.trunk_id = Some("ST_trunk".to_string());
        config.outbound.sip_domain = Some("sip.vobiz.example".to_string());
        config.livekit.url = Some("wss://outdial.livekit.cloud".to_string());
        config.livekit.api_key = Some("key".to_string());
        config.livekit.api_secret = Some("secret".to_string());
        config
    }

    #[test]
    fn test_room_name_format() {
        assert_eq!(room_name_for("+919876543210", 4821), "call-919876543210-4821");
    }

    #[tokio::test]
    async fn test_dispatch_creates_room_then_agent_job() {
        let dispatcher = CallDispatcher::new(ready_config(), FakeApi::default());
        let receipt = dispatcher.dispatch(" +91 98765-43210 ").await.unwrap();

        assert_eq!(receipt.phone_number, "+919876543210");
        assert_eq!(receipt.dispatch_id, "AD_test");
        assert_eq!(receipt.agent_name, "outbound-caller");

        let suffix: u16 = receipt
            .room_name
            .strip_prefix("call-919876543210-")
            .unwrap()
            .parse()
            .unwrap();
        assert!((1000..=9999).contains(&suffix));

        let rooms = dispatcher.api.rooms.lock();
        assert_eq!(rooms[0].empty_timeout, Duration::from_secs(300));
        assert_eq!(rooms[0].max_participants, 10);

        let dispatches = dispatcher.api.dispatches.lock();
        assert_eq!(dispatches[0].room, receipt.room_name);
        let metadata: serde_json::Value = serde_json::from_str(&dispatches[0].metadata).unwrap();
        assert_eq!(metadata, serde_json::json!({ "phone_number": "+919876543210" }));
    }

    #[tokio::test]
    async fn test_existing_room_is_tolerated() {
        let api = FakeApi {
            room_error: Some(("already_exists", "room already exists")),
            ..Default::default()
        };
        let dispatcher = CallDispatcher::new(ready_config(), api);
        assert!(dispatcher.dispatch("+919876543210").await.is_ok());
        assert_eq!(dispatcher.api.dispatches.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_other_room_errors_abort() {
        let api = FakeApi {
            room_error: Some(("permission_denied", "no roomCreate grant")),
            ..Default::default()
        };
        let dispatcher = CallDispatcher::new(ready_config(), api);
        let err = dispatcher.dispatch("+919876543210").await.unwrap_err();
        assert_eq!(err.exit_code(), 69);
        assert!(dispatcher.api.dispatches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_api_error() {
        let api = FakeApi {
            fail_dispatch: true,
            ..Default::default()
        };
        let err = CallDispatcher::new(ready_config(), api)
            .dispatch("+919876543210")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Api(_)));
    }

    #[tokio::test]
    async fn test_disabled_outbound_touches_nothing() {
        let mut config = ready_config();
        config.outbound.enabled = false;
        let dispatcher = CallDispatcher::new(config, FakeApi::default());

        let err = dispatcher.dispatch("+919876543210").await.unwrap_err();
        assert!(matches!(err, DispatchError::Disabled));
        assert_eq!(err.exit_code(), 78);
        assert!(dispatcher.api.rooms.lock().is_empty());
    }

    #[test]
    fn test_preflight_errors() {
        let dispatcher = CallDispatcher::new(ready_config(), FakeApi::default());
        let err = dispatcher.prepare("call me").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidNumber));
        assert_eq!(err.exit_code(), 65);

        let mut config = ready_config();
        config.outbound.trunk_id = None;
        let err = CallDispatcher::new(config, FakeApi::default())
            .prepare("+919876543210")
            .unwrap_err();
        assert!(err.to_string().contains("OUTBOUND_TRUNK_ID"));

        let mut config = ready_config();
        config.outbound.sip_domain = None;
        let err = CallDispatcher::new(config, FakeApi::default())
            .prepare("+919876543210")
            .unwrap_err();
        assert!(err.to_string().contains("VOBIZ_SIP_DOMAIN"));

        let mut config = ready_config();
        config.livekit.api_key = None;
        let err = CallDispatcher::new(config, FakeApi::default())
            .prepare("+919876543210")
            .unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }
}
