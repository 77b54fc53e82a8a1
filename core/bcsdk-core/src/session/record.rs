use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_PREFIX: &str = "DEMO";
const ID_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The persisted session. `start_time` is set once; `last_activity` only moves
/// forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(rename = "csid", alias = "sessionId")]
    pub session_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        SessionRecord {
            session_id: session_id.into(),
            start_time: now,
            last_activity: now,
            is_authenticated: false,
        }
    }

    /// Records activity at `now`. A clock that went backwards leaves the record as is.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = self.last_activity.max(now);
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }
}

/// New session id: `DEMO_<epoch ms>_<6 base36 chars>`.
pub fn generate_csid(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}_{}_{}", ID_PREFIX, now.timestamp_millis(), suffix)
}
