//! Error types for bcsdk-core operations.
//!
//! Public entry points of the lifecycle manager, the CSID bootstrap and the SDK
//! adapters never return these to the page; they log them and hand back an
//! outcome value instead. Lower layers (storage, configuration) use `Result`.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborator fault (returned by SDK globals)
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure raised by an SDK global while handling a call.
///
/// The SDK is an opaque collaborator, so all we keep is its message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SdkFault {
    pub message: String,
}

impl SdkFault {
    pub fn new(message: impl Into<String>) -> Self {
        SdkFault {
            message: message.into(),
        }
    }
}

impl From<String> for SdkFault {
    fn from(message: String) -> Self {
        SdkFault { message }
    }
}

impl From<&str> for SdkFault {
    fn from(message: &str) -> Self {
        SdkFault::new(message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    // ─────────────────────────────────────────────────────────────────────
    // Tab Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Tab storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Tab storage read failed: {key}: {details}")]
    StorageRead { key: String, details: String },

    #[error("Tab storage write failed: {key}: {details}")]
    StorageWrite { key: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Session Record Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Session record encoding failed: {source}")]
    RecordEncode {
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // SDK Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("SDK global does not exist: {global}")]
    SdkMissing { global: String },

    #[error("SDK call failed: {operation}: {source}")]
    SdkCall {
        operation: String,
        #[source]
        source: SdkFault,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file unreadable: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigParse { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
