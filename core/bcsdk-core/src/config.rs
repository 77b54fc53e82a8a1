//! Bridge configuration: timeouts, polling cadence, and SDK endpoints.
//!
//! Loaded from TOML. Every section and field has a default, so an empty or missing
//! file yields the reference behavior (30 min sessions swept every minute, CSID
//! polled every second for ten seconds).

use std::path::Path;
use std::time::Duration;

use bcsdk_protocol::{
    ClientConfiguration, CollectionMode, CollectionSettings, DirectConfiguration, ElementSettings,
};
use serde::{Deserialize, Serialize};

use crate::document::CSID_META;
use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub csid: CsidConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub storage_key: String,
    pub timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Grace period between creating a session and pushing its id to the SDK.
    pub new_session_delay_ms: u64,
    /// Re-arm the expiry sweep after it replaces a session.
    pub re_arm_sweep: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: "biocatch_session".to_string(),
            timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
            new_session_delay_ms: 100,
            re_arm_sweep: true,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn new_session_delay(&self) -> Duration {
        Duration::from_millis(self.new_session_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsidConfig {
    pub meta_name: String,
    pub poll_interval_ms: u64,
    pub deadline_ms: u64,
    /// Values of this many characters or fewer are not a session id yet.
    pub min_len: usize,
}

impl Default for CsidConfig {
    fn default() -> Self {
        Self {
            meta_name: CSID_META.to_string(),
            poll_interval_ms: 1_000,
            deadline_ms: 10_000,
            min_len: 10,
        }
    }
}

impl CsidConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub collector_url: String,
    pub tenant_id: String,
    pub wup_server_url: String,
    pub log_server_url: String,
    pub enable_custom_elements_processing: bool,
    pub agent_type: String,
    pub collection_mode: String,
    pub custom_element_attribute: String,
    pub max_shadow_depth: u32,
    /// Origin used as `targetOrigin` for window messages.
    pub page_origin: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            collector_url: "https://wup.example.com".to_string(),
            tenant_id: "dummy".to_string(),
            wup_server_url: "https://wup.example.com/client/v3.1/web/wup?v=1&cid=dummy"
                .to_string(),
            log_server_url: "https://logs.example.com/api/v1/sendLogs".to_string(),
            enable_custom_elements_processing: true,
            agent_type: "secondary".to_string(),
            collection_mode: "lean".to_string(),
            custom_element_attribute: "data-bb".to_string(),
            max_shadow_depth: 25,
            page_origin: "https://localhost".to_string(),
        }
    }
}

impl ClientConfig {
    /// Payload installed as `bcClientConfiguration` for the hybrid client.
    pub fn hybrid_configuration(&self) -> ClientConfiguration {
        ClientConfiguration {
            log_server_url: self.log_server_url.clone(),
            enable_custom_elements_processing: self.enable_custom_elements_processing,
            collection_settings: CollectionSettings {
                mode: Some(CollectionMode {
                    agent_type: self.agent_type.clone(),
                    collection_mode: self.collection_mode.clone(),
                }),
                element_settings: None,
            },
        }
    }

    /// Payload the direct `cdApi` returns from `getConfigurations`.
    pub fn direct_configuration(&self) -> DirectConfiguration {
        DirectConfiguration {
            wup_server_url: self.wup_server_url.clone(),
            log_server_url: self.log_server_url.clone(),
            enable_custom_elements_processing: self.enable_custom_elements_processing,
            max_shadow_depth: self.max_shadow_depth,
            collection_settings: CollectionSettings {
                mode: None,
                element_settings: Some(ElementSettings {
                    custom_element_attribute: self.custom_element_attribute.clone(),
                }),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_ms: u64,
    pub max_check_attempts: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_check_attempts: 3,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Loads configuration from `path`; a missing file yields defaults.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    if !path.exists() {
        return Ok(BridgeConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| BridgeError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<BridgeConfig>(&content).map_err(|err| BridgeError::ConfigParse {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
