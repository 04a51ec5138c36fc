//! Twirp JSON messages for the server API
//!
//! Field names follow the protobuf names. Responses accept the camelCase
//! spelling too and 64-bit integers may arrive as strings.

use serde::{Deserialize, Deserializer, Serialize};

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(i64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Number(n) => Ok(n),
        Wire::Text(s) if s.is_empty() => Ok(0),
        Wire::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// `livekit.RoomService/CreateRoom` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub empty_timeout: u32,
    pub max_participants: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListParticipantsRequest {
    pub room: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParticipantsResponse {
    #[serde(default)]
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantInfo {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default, alias = "joinedAt", deserialize_with = "lenient_i64")]
    pub joined_at: i64,
    /// Enum name (`"AGENT"`) or number (`4`) depending on the server encoder
    #[serde(default)]
    pub kind: serde_json::Value,
}

impl ParticipantInfo {
    pub fn is_agent(&self) -> bool {
        self.kind == "AGENT" || self.kind == 4
    }
}

/// `livekit.AgentDispatchService/CreateDispatch` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAgentDispatchRequest {
    pub agent_name: String,
    pub room: String,
    pub metadata: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentDispatch {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "agentName")]
    pub agent_name: String,
    #[serde(default)]
    pub room: String,
}

/// `livekit.SIP/CreateSIPParticipant` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSipParticipantRequest {
    pub sip_trunk_id: String,
    pub sip_call_to: String,
    pub room_name: String,
    pub participant_identity: String,
    pub wait_until_answered: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SipParticipantInfo {
    #[serde(default, alias = "participantId")]
    pub participant_id: String,
    #[serde(default, alias = "participantIdentity")]
    pub participant_identity: String,
    #[serde(default, alias = "sipCallId")]
    pub sip_call_id: String,
}

/// `livekit.SIP/TransferSIPParticipant` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferSipParticipantRequest {
    pub participant_identity: String,
    pub room_name: String,
    pub transfer_to: String,
    pub play_dialtone: bool,
}

/// Replace-the-list update of a repeated field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListUpdate {
    pub set: Vec<String>,
}

/// Fields of an outbound trunk to overwrite. Unset fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SipOutboundTrunkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,
    pub numbers: ListUpdate,
}

/// `livekit.SIP/UpdateSIPOutboundTrunk` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateSipOutboundTrunkRequest {
    pub sip_trunk_id: String,
    pub update: SipOutboundTrunkUpdate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SipOutboundTrunkInfo {
    #[serde(default, alias = "sipTrunkId")]
    pub sip_trunk_id: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub numbers: Vec<String>,
}

/// Error body of a failed Twirp call
#[derive(Debug, Clone, Deserialize)]
pub struct TwirpError {
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_participant_joined_at_as_string_or_number() {
        let listed: ListParticipantsResponse = serde_json::from_value(json!({
            "participants": [
                { "identity": "sip_919876543210", "joined_at": "1700000010", "kind": "SIP" },
                { "identity": "outbound-caller", "joinedAt": 1700000005, "kind": "AGENT" },
                { "identity": "web-visitor" }
            ]
        }))
        .unwrap();

        let p = &listed.participants;
        assert_eq!(p[0].joined_at, 1_700_000_010);
        assert_eq!(p[1].joined_at, 1_700_000_005);
        assert_eq!(p[2].joined_at, 0);
        assert!(!p[0].is_agent());
        assert!(p[1].is_agent());
        assert!(!p[2].is_agent());
    }

    #[test]
    fn test_trunk_update_omits_unset_fields() {
        let request = UpdateSipOutboundTrunkRequest {
            sip_trunk_id: "ST_abc".to_string(),
            update: SipOutboundTrunkUpdate {
                address: Some("sip.vobiz.example".to_string()),
                numbers: ListUpdate {
                    set: vec!["+911234567890".to_string()],
                },
                ..Default::default()
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "sip_trunk_id": "ST_abc",
                "update": {
                    "address": "sip.vobiz.example",
                    "numbers": { "set": ["+911234567890"] }
                }
            })
        );
    }

    #[test]
    fn test_twirp_error_body() {
        let err: TwirpError =
            serde_json::from_str(r#"{"code":"already_exists","msg":"room already exists"}"#).unwrap();
        assert_eq!(err.code, "already_exists");
        assert_eq!(err.msg, "room already exists");
    }
}
