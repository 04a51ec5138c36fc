//! Server API access tokens

use std::time::Duration;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How long a signed token stays valid
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);

/// Room permissions carried in the `video` claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrants {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_create: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_list: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Telephony permissions carried in the `sip` claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipGrants {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub call: bool,
}

/// JWT claims understood by the LiveKit server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default)]
    pub video: VideoGrants,
    #[serde(default)]
    pub sip: SipGrants,
}

/// Signs HS256 access tokens with an API key and secret
#[derive(Clone)]
pub struct AccessToken {
    api_key: String,
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl AccessToken {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            encoding_key: EncodingKey::from_secret(api_secret.as_bytes()),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Claims for a server-side call with the given grants
    pub fn claims(&self, video: VideoGrants, sip: SipGrants) -> AccessClaims {
        let now = Utc::now().timestamp();
        AccessClaims {
            iss: self.api_key.clone(),
            sub: self.api_key.clone(),
            nbf: now,
            exp: now + self.ttl.as_secs() as i64,
            video,
            sip,
        }
    }

    /// Sign a token carrying the given grants
    pub fn sign(&self, video: VideoGrants, sip: SipGrants) -> Result<String> {
        let claims = self.claims(video, sip);
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("api_key", &self.api_key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn test_signed_token_round_trips_claims() {
        let token = AccessToken::new("APIkey123", "s3cr3t");
        let jwt = token
            .sign(
                VideoGrants {
                    room_admin: true,
                    room: Some("call-919876543210-4821".to_string()),
                    ..Default::default()
                },
                SipGrants {
                    call: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        let decoded = decode::<AccessClaims>(&jwt, &DecodingKey::from_secret(b"s3cr3t"), &validation).unwrap();

        assert_eq!(decoded.claims.iss, "APIkey123");
        assert!(decoded.claims.video.room_admin);
        assert!(!decoded.claims.video.room_create);
        assert_eq!(decoded.claims.video.room.as_deref(), Some("call-919876543210-4821"));
        assert!(decoded.claims.sip.call);
        assert_eq!(decoded.claims.exp - decoded.claims.nbf, 600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let jwt = AccessToken::new("APIkey123", "s3cr3t")
            .sign(VideoGrants::default(), SipGrants::default())
            .unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        assert!(decode::<AccessClaims>(&jwt, &DecodingKey::from_secret(b"other"), &validation).is_err());
    }

    #[test]
    fn test_unset_grants_are_omitted() {
        let claims = AccessToken::new("k", "s").claims(
            VideoGrants {
                room_list: true,
                ..Default::default()
            },
            SipGrants::default(),
        );
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["video"], serde_json::json!({ "roomList": true }));
        assert_eq!(json["sip"], serde_json::json!({}));
    }
}
