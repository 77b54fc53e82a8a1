//! The session record under one tab-storage key.
//!
//! Reads are forgiving: a missing, unreadable or corrupt record is "no session"
//! (corrupt data logs a warning). Writes report failures after logging them.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use super::record::SessionRecord;
use crate::error::{BridgeError, Result};
use crate::storage::TabStorage;

#[derive(Clone)]
pub struct SessionStore {
    storage: Rc<dyn TabStorage>,
    key: String,
}

impl SessionStore {
    pub fn new(storage: Rc<dyn TabStorage>, key: impl Into<String>) -> Self {
        SessionStore {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrites the stored record.
    pub fn store(&self, record: &SessionRecord) -> Result<()> {
        let result = serde_json::to_string(record)
            .map_err(|source| BridgeError::RecordEncode { source })
            .and_then(|json| self.storage.set_item(&self.key, &json));
        if let Err(err) = &result {
            error!(key = %self.key, error = %err, "Failed to store session record");
        }
        result
    }

    pub fn load(&self) -> Option<SessionRecord> {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!(key = %self.key, error = %err, "Failed to read session record");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(key = %self.key, error = %err, "Ignoring corrupt session record");
                None
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        let result = self.storage.remove_item(&self.key);
        if let Err(err) = &result {
            error!(key = %self.key, error = %err, "Failed to clear session record");
        }
        result
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("key", &self.key).finish()
    }
}

/// True while the record has seen activity within `timeout` of `now`.
pub fn is_valid(record: &SessionRecord, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
    record.idle_for(now) <= timeout
}
