//! Wire types shared by the SDK adapters and their hosts.
//!
//! This crate keeps the shape of everything that crosses the page boundary in one
//! place: messages posted to the window for the direct SDK, notifications the SDK
//! posts back, the configuration payloads handed to either SDK variant, and the
//! heartbeat report sent when the SDK looks unhealthy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version passed to the hybrid client's `start` call.
pub const PROTOCOL_VERSION: u32 = 4;

/// Reset reason the direct SDK expects when a session is restarted by the page.
pub const RESET_REASON_CUSTOMER_API: &str = "customerApi";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound (page → direct SDK)
// ─────────────────────────────────────────────────────────────────────────────

/// Messages the direct-mode `cdApi` posts to the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    ContextChange {
        context: String,
    },
    ResetSession {
        #[serde(rename = "resetReason")]
        reset_reason: String,
        csid: String,
    },
    #[serde(rename = "cdSetCsid")]
    SetCsid { csid: String },
    #[serde(rename = "cdSetCustomerBrand")]
    SetCustomerBrand { brand: String },
}

impl OutboundMessage {
    pub fn context_change(context: impl Into<String>) -> Self {
        OutboundMessage::ContextChange {
            context: context.into(),
        }
    }

    pub fn reset_session(csid: impl Into<String>) -> Self {
        OutboundMessage::ResetSession {
            reset_reason: RESET_REASON_CUSTOMER_API.to_string(),
            csid: csid.into(),
        }
    }

    pub fn set_csid(csid: impl Into<String>) -> Self {
        OutboundMessage::SetCsid { csid: csid.into() }
    }

    pub fn set_customer_brand(brand: impl Into<String>) -> Self {
        OutboundMessage::SetCustomerBrand {
            brand: brand.into(),
        }
    }

    /// The `type` discriminator as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::ContextChange { .. } => "ContextChange",
            OutboundMessage::ResetSession { .. } => "ResetSession",
            OutboundMessage::SetCsid { .. } => "cdSetCsid",
            OutboundMessage::SetCustomerBrand { .. } => "cdSetCustomerBrand",
        }
    }

    pub fn validate(&self) -> Result<(), ErrorInfo> {
        match self {
            OutboundMessage::ContextChange { context } => require_text(context, "context"),
            OutboundMessage::ResetSession { reset_reason, csid } => {
                require_text(reset_reason, "resetReason")?;
                require_text(csid, "csid")
            }
            OutboundMessage::SetCsid { csid } => require_text(csid, "csid"),
            OutboundMessage::SetCustomerBrand { brand } => require_text(brand, "brand"),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn require_text(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "missing_field",
            format!("{} is required", field),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound (SDK → page)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: String,
}

impl StateChange {
    /// The SDK accepts session calls once it reports `starting` or `started`.
    pub fn is_ready(&self) -> bool {
        matches!(self.state.as_str(), "starting" | "started")
    }
}

/// Heartbeat payload: the literal `"Ok"` or a list of SDK error numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeartbeatStatus {
    Errors(Vec<i64>),
    Text(String),
}

impl HeartbeatStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HeartbeatStatus::Text(text) if text == "Ok")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "cdStateChangedEvent")]
    StateChanged { event: StateChange },
    #[serde(rename = "cdHeartbeat")]
    Heartbeat { data: HeartbeatStatus },
}

const INBOUND_TYPES: &[&str] = &["cdStateChangedEvent", "cdHeartbeat"];

/// Parses a window message posted by the SDK.
///
/// Messages of other types share the window channel with unrelated scripts, so
/// they are not errors: they come back as `Ok(None)`.
pub fn parse_inbound(value: Value) -> Result<Option<InboundMessage>, ErrorInfo> {
    let message_type = match value.get("type").and_then(Value::as_str) {
        Some(message_type) => message_type,
        None => return Err(ErrorInfo::new("missing_type", "message type is required")),
    };

    if !INBOUND_TYPES.contains(&message_type) {
        return Ok(None);
    }

    serde_json::from_value(value).map(Some).map_err(|err| {
        ErrorInfo::new(
            "invalid_message",
            format!("inbound message is malformed: {}", err),
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMode {
    pub agent_type: String,
    pub collection_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSettings {
    pub custom_element_attribute: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CollectionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_settings: Option<ElementSettings>,
}

/// Configuration handed to the hybrid client's `start` call
/// (`window.bcClientConfiguration`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfiguration {
    #[serde(rename = "logServerURL")]
    pub log_server_url: String,
    pub enable_custom_elements_processing: bool,
    #[serde(default)]
    pub collection_settings: CollectionSettings,
}

/// Configuration returned by the direct SDK's `getConfigurations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectConfiguration {
    #[serde(rename = "wupServerURL")]
    pub wup_server_url: String,
    #[serde(rename = "logServerURL")]
    pub log_server_url: String,
    pub enable_custom_elements_processing: bool,
    pub max_shadow_depth: u32,
    #[serde(default)]
    pub collection_settings: CollectionSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// Heartbeat report
// ─────────────────────────────────────────────────────────────────────────────

pub const JS_UNAVAILABLE: &str = "js_unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsStatus {
    Errors(Vec<String>),
    Text(String),
}

/// Update sent to the scoring API when the SDK script is blocked or reports errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatReport {
    pub action: String,
    pub js_status: JsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(
        rename = "customerSessionID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "customerID", default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl HeartbeatReport {
    pub fn js_unavailable() -> Self {
        Self::with_status(JsStatus::Text(JS_UNAVAILABLE.to_string()))
    }

    pub fn errors(codes: &[i64]) -> Self {
        Self::with_status(JsStatus::Errors(
            codes.iter().map(|code| format!("error({})", code)).collect(),
        ))
    }

    fn with_status(js_status: JsStatus) -> Self {
        Self {
            action: "update".to_string(),
            js_status,
            uuid: None,
            customer_session_id: None,
            brand: None,
            customer_id: None,
            user_agent: None,
        }
    }
}
