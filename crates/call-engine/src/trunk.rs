//! Outbound trunk maintenance
//!
//! Pushes the provider address, auth credentials and caller number from the
//! environment onto the existing outbound trunk. Fixes trunks that were
//! created with stale credentials and fail with auth retry errors.

use tracing::info;

use crate::config::AgentConfig;
use crate::error::{CallEngineError, Result};
use crate::livekit::{
    LiveKitApi, ListUpdate, SipOutboundTrunkInfo, SipOutboundTrunkUpdate, UpdateSipOutboundTrunkRequest,
};

/// Update of the configured outbound trunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkUpdate {
    request: UpdateSipOutboundTrunkRequest,
}

impl TrunkUpdate {
    /// Build the update from configuration. The trunk id is required.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let trunk_id = config
            .outbound
            .trunk_id
            .clone()
            .ok_or_else(|| CallEngineError::config("OUTBOUND_TRUNK_ID not found in .env"))?;

        Ok(Self {
            request: UpdateSipOutboundTrunkRequest {
                sip_trunk_id: trunk_id,
                update: SipOutboundTrunkUpdate {
                    address: config.outbound.sip_domain.clone(),
                    auth_username: config.trunk.username.clone(),
                    auth_password: config.trunk.password.clone(),
                    numbers: ListUpdate {
                        set: config.trunk.outbound_number.iter().cloned().collect(),
                    },
                },
            },
        })
    }

    pub fn trunk_id(&self) -> &str {
        &self.request.sip_trunk_id
    }

    pub fn request(&self) -> &UpdateSipOutboundTrunkRequest {
        &self.request
    }

    pub async fn apply(&self, api: &LiveKitApi) -> Result<SipOutboundTrunkInfo> {
        let update = &self.request.update;
        info!("🔧 Updating SIP Trunk: {}", self.request.sip_trunk_id);
        info!("  Address: {}", update.address.as_deref().unwrap_or("<unchanged>"));
        info!("  Username: {}", update.auth_username.as_deref().unwrap_or("<unchanged>"));
        info!("  Numbers: {:?}", update.numbers.set);

        let trunk = api.update_outbound_trunk(&self.request).await?;
        info!("✅ SIP trunk updated successfully.");
        Ok(trunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_from_config() {
        let mut config = AgentConfig::default();
        config.outbound.trunk_id = Some("ST_abc".to_string());
        config.outbound.sip_domain = Some("sip.vobiz.example".to_string());
        config.trunk.username = Some("vobiz-user".to_string());
        config.trunk.password = Some("pw".to_string());
        config.trunk.outbound_number = Some("+911234567890".to_string());

        let update = TrunkUpdate::from_config(&config).unwrap();
        assert_eq!(update.trunk_id(), "ST_abc");
        let fields = &update.request().update;
        assert_eq!(fields.address.as_deref(), Some("sip.vobiz.example"));
        assert_eq!(fields.auth_username.as_deref(), Some("vobiz-user"));
        assert_eq!(fields.numbers.set, vec!["+911234567890".to_string()]);
    }

    #[test]
    fn test_missing_number_clears_list() {
        let mut config = AgentConfig::default();
        config.outbound.trunk_id = Some("ST_abc".to_string());
        let update = TrunkUpdate::from_config(&config).unwrap();
        assert!(update.request().update.numbers.set.is_empty());
    }

    #[test]
    fn test_trunk_id_required() {
        let err = TrunkUpdate::from_config(&AgentConfig::default()).unwrap_err();
        assert!(matches!(err, CallEngineError::Config(_)));
    }
}
