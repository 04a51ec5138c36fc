use serde::Deserialize;
use tracing::warn;

use crate::error::{CallEngineError, Result};
use crate::phone::normalize_phone;

/// One dispatched job: the room to serve and the payload the dispatcher attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallJob {
    pub room_name: String,
    pub metadata: Option<String>,
}

impl CallJob {
    pub fn new(room_name: impl Into<String>, metadata: Option<String>) -> Self {
        Self {
            room_name: room_name.into(),
            metadata,
        }
    }

    /// Normalised outbound target, or `None` for an inbound/web call
    pub fn outbound_target(&self) -> Option<String> {
        JobMetadata::outbound_target(self.metadata.as_deref())
    }
}

/// Job metadata written by the dispatch tool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobMetadata {
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl JobMetadata {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CallEngineError::Metadata(e.to_string()))
    }

    /// Read the phone number from a raw payload.
    ///
    /// A missing payload, malformed JSON, a missing field and a number with no
    /// digits all mean there is nobody to dial.
    pub fn outbound_target(raw: Option<&str>) -> Option<String> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;

        let metadata = match Self::parse(raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("No valid JSON metadata found. This might be an inbound call. ({})", e);
                return None;
            }
        };

        let normalized = normalize_phone(metadata.phone_number.as_deref().unwrap_or_default());
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_is_normalized() {
        let job = CallJob::new("call-1", Some(r#"{"phone_number": "+91 98765-43210"}"#.to_string()));
        assert_eq!(job.outbound_target().as_deref(), Some("+919876543210"));
    }

    #[test]
    fn test_missing_or_bad_metadata_means_inbound() {
        assert_eq!(JobMetadata::outbound_target(None), None);
        assert_eq!(JobMetadata::outbound_target(Some("")), None);
        assert_eq!(JobMetadata::outbound_target(Some("not json")), None);
        assert_eq!(JobMetadata::outbound_target(Some("{}")), None);
        assert_eq!(JobMetadata::outbound_target(Some(r#"{"phone_number": "n/a"}"#)), None);
        assert_eq!(JobMetadata::outbound_target(Some(r#"{"phone_number": 919876543210}"#)), None);
    }

    #[test]
    fn test_parse_error_is_metadata_error() {
        assert!(matches!(JobMetadata::parse("{"), Err(CallEngineError::Metadata(_))));
    }
}
