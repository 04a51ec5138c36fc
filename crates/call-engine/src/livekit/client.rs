use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::LiveKitConfig;
use crate::dispatch::{DispatchApi, DispatchRequest, RoomRequest};
use crate::error::{CallEngineError, Result};
use crate::telephony::{DialRequest, Participant, Telephony};

use super::token::{AccessToken, SipGrants, VideoGrants};
use super::types::*;

/// Deadline for ordinary API requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for a dial that waits for the callee to pick up
pub const ANSWER_TIMEOUT: Duration = Duration::from_secs(90);

/// Rewrite a websocket server URL to its HTTP equivalent
pub fn http_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        url.to_string()
    }
}

/// LiveKit server API over Twirp JSON
#[derive(Debug, Clone)]
pub struct LiveKitApi {
    base_url: String,
    token: AccessToken,
    http: reqwest::Client,
}

impl LiveKitApi {
    pub fn new(config: &LiveKitConfig) -> Result<Self> {
        let (Some(url), Some(key), Some(secret)) = (&config.url, &config.api_key, &config.api_secret)
        else {
            return Err(CallEngineError::config("LiveKit credentials missing in .env.local"));
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CallEngineError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: http_url(url),
            token: AccessToken::new(key, secret),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, service: &str, method: &str) -> String {
        format!("{}/twirp/livekit.{}/{}", self.base_url, service, method)
    }

    async fn twirp<Req, Resp>(
        &self,
        service: &str,
        method: &str,
        body: &Req,
        grants: (VideoGrants, SipGrants),
        timeout: Duration,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(service, method);
        let jwt = self.token.sign(grants.0, grants.1)?;
        debug!("➡️ POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(jwt)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<TwirpError>(&text) {
                Ok(err) => CallEngineError::api(err.code, err.msg),
                Err(_) => CallEngineError::api(status.as_str(), text),
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn room_admin(room: &str) -> VideoGrants {
        VideoGrants {
            room_admin: true,
            room: Some(room.to_string()),
            ..Default::default()
        }
    }

    pub async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room> {
        let grants = VideoGrants {
            room_create: true,
            ..Default::default()
        };
        self.twirp("RoomService", "CreateRoom", request, (grants, SipGrants::default()), DEFAULT_REQUEST_TIMEOUT)
            .await
    }

    pub async fn list_participants(&self, room: &str) -> Result<Vec<ParticipantInfo>> {
        let request = ListParticipantsRequest {
            room: room.to_string(),
        };
        let response: ListParticipantsResponse = self
            .twirp(
                "RoomService",
                "ListParticipants",
                &request,
                (Self::room_admin(room), SipGrants::default()),
                DEFAULT_REQUEST_TIMEOUT,
            )
            .await?;
        Ok(response.participants)
    }

    pub async fn create_dispatch(&self, request: &CreateAgentDispatchRequest) -> Result<AgentDispatch> {
        self.twirp(
            "AgentDispatchService",
            "CreateDispatch",
            request,
            (Self::room_admin(&request.room), SipGrants::default()),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .await
    }

    pub async fn create_sip_participant(&self, request: &CreateSipParticipantRequest) -> Result<SipParticipantInfo> {
        let sip = SipGrants {
            call: true,
            ..Default::default()
        };
        let timeout = if request.wait_until_answered {
            ANSWER_TIMEOUT
        } else {
            DEFAULT_REQUEST_TIMEOUT
        };
        self.twirp("SIP", "CreateSIPParticipant", request, (Self::room_admin(&request.room_name), sip), timeout)
            .await
    }

    pub async fn transfer_sip_participant(&self, request: &TransferSipParticipantRequest) -> Result<()> {
        let sip = SipGrants {
            call: true,
            ..Default::default()
        };
        let _: serde_json::Value = self
            .twirp(
                "SIP",
                "TransferSIPParticipant",
                request,
                (Self::room_admin(&request.room_name), sip),
                DEFAULT_REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    pub async fn update_outbound_trunk(&self, request: &UpdateSipOutboundTrunkRequest) -> Result<SipOutboundTrunkInfo> {
        let sip = SipGrants {
            admin: true,
            ..Default::default()
        };
        self.twirp("SIP", "UpdateSIPOutboundTrunk", request, (VideoGrants::default(), sip), DEFAULT_REQUEST_TIMEOUT)
            .await
    }
}

#[async_trait]
impl DispatchApi for LiveKitApi {
    async fn create_room(&self, request: &RoomRequest) -> Result<()> {
        let wire = CreateRoomRequest {
            name: request.name.clone(),
            empty_timeout: request.empty_timeout.as_secs() as u32,
            max_participants: request.max_participants,
        };
        let room = LiveKitApi::create_room(self, &wire).await?;
        debug!("Room {} created (sid {})", room.name, room.sid);
        Ok(())
    }

    async fn create_dispatch(&self, request: &DispatchRequest) -> Result<AgentDispatch> {
        let wire = CreateAgentDispatchRequest {
            agent_name: request.agent_name.clone(),
            room: request.room.clone(),
            metadata: request.metadata.clone(),
        };
        LiveKitApi::create_dispatch(self, &wire).await
    }
}

/// [`Telephony`] bound to one room
#[derive(Debug, Clone)]
pub struct LiveKitTelephony {
    api: Arc<LiveKitApi>,
    room_name: String,
}

impl LiveKitTelephony {
    pub fn new(api: Arc<LiveKitApi>, room_name: impl Into<String>) -> Self {
        Self {
            api,
            room_name: room_name.into(),
        }
    }
}

#[async_trait]
impl Telephony for LiveKitTelephony {
    fn room_name(&self) -> &str {
        &self.room_name
    }

    async fn dial(&self, request: DialRequest) -> Result<Participant> {
        let wire = CreateSipParticipantRequest {
            sip_trunk_id: request.trunk_id,
            sip_call_to: request.call_to,
            room_name: self.room_name.clone(),
            participant_identity: request.participant_identity.clone(),
            wait_until_answered: request.wait_until_answered,
        };
        let info = self
            .api
            .create_sip_participant(&wire)
            .await
            .map_err(|e| CallEngineError::dial(e.to_string()))?;

        info!("📞 SIP participant {} joined (call id {})", info.participant_identity, info.sip_call_id);
        let identity = if info.participant_identity.is_empty() {
            request.participant_identity
        } else {
            info.participant_identity
        };
        Ok(Participant::new(identity, Utc::now().timestamp()))
    }

    async fn transfer_participant(&self, identity: &str, destination: &str) -> Result<()> {
        let wire = TransferSipParticipantRequest {
            participant_identity: identity.to_string(),
            room_name: self.room_name.clone(),
            transfer_to: destination.to_string(),
            play_dialtone: false,
        };
        self.api
            .transfer_sip_participant(&wire)
            .await
            .map_err(|e| CallEngineError::transfer(e.to_string()))
    }

    async fn remote_participants(&self) -> Result<Vec<Participant>> {
        let listed = self.api.list_participants(&self.room_name).await?;
        Ok(listed
            .into_iter()
            .filter(|p| !p.is_agent())
            .map(|p| Participant::new(p.identity, p.joined_at))
            .collect())
    }
}
