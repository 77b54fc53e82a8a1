//! Session lifecycle
//!
//! One tracking session per tab, persisted in tab storage so it survives reloads.
//!
//! ```text
//! page load → SessionManager::initialize_application
//!               ├─ stored record fresh  → restore id, push to SDK
//!               └─ absent / stale       → start_new_session (push after grace delay)
//!             then: expiry sweep armed, activity hooks live
//! ```
//!
//! # Module Structure
//!
//! - [`record`]: the persisted [`SessionRecord`] and id generation
//! - [`store`]: [`SessionStore`], the record under a single tab-storage key
//! - [`manager`]: [`SessionManager`], the state machine over store, SDK and timers
//!
//! A record is fresh while `now - lastActivity <= timeout` (30 minutes by default).

mod manager;
mod record;
mod store;

pub use manager::{InitOutcome, PageEvent, SessionManager};
pub use record::{generate_csid, SessionRecord};
pub use store::{is_valid, SessionStore};
