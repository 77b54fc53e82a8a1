//! Session lifecycle manager.
//!
//! Owns the tab's session: creates or restores it on first load, refreshes it on
//! activity, replaces it when it expires or the user logs out, and pushes the
//! current id to the SDK. Every entry point absorbs its failures (logged) and
//! returns a plain outcome.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::record::{generate_csid, SessionRecord};
use super::store::{is_valid, SessionStore};
use crate::config::SessionConfig;
use crate::event_loop::{to_chrono, EventLoop, TimerId};
use crate::sdk::SessionSdk;
use crate::storage::TabStorage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "csid", rename_all = "snake_case")]
pub enum InitOutcome {
    AlreadyInitialized,
    /// A fresh stored session was resumed.
    Restored(String),
    /// A new session was started; `None` when the SDK was not available.
    Started(Option<String>),
}

impl InitOutcome {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            InitOutcome::Restored(id) | InitOutcome::Started(Some(id)) => Some(id),
            _ => None,
        }
    }
}

/// Page events the activity hooks react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    VisibilityChange { hidden: bool },
    BeforeUnload,
}

#[derive(Default)]
struct ManagerState {
    initialized: bool,
    current_session_id: Option<String>,
    sweep: Option<TimerId>,
    hooks_attached: bool,
}

struct Inner {
    config: SessionConfig,
    timeout: chrono::Duration,
    store: SessionStore,
    sdk: Rc<dyn SessionSdk>,
    event_loop: EventLoop,
    state: RefCell<ManagerState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(sweep) = self.state.get_mut().sweep.take() {
            self.event_loop.clear(sweep);
        }
    }
}

/// Handle to the tab's session manager. Clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SessionManager")
            .field("mode", &self.inner.sdk.mode())
            .field("initialized", &state.initialized)
            .field("current_session_id", &state.current_session_id)
            .field("sweep", &state.sweep)
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        config: &SessionConfig,
        storage: Rc<dyn TabStorage>,
        sdk: Rc<dyn SessionSdk>,
        event_loop: EventLoop,
    ) -> Self {
        SessionManager {
            inner: Rc::new(Inner {
                config: config.clone(),
                timeout: to_chrono(config.timeout()),
                store: SessionStore::new(storage, config.storage_key.clone()),
                sdk,
                event_loop,
                state: RefCell::new(ManagerState::default()),
            }),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.event_loop.now()
    }

    /// Establishes the tab's session once per page.
    pub fn initialize_application(&self) -> InitOutcome {
        if self.inner.state.borrow().initialized {
            debug!("Application already initialized");
            return InitOutcome::AlreadyInitialized;
        }

        let now = self.now();
        let outcome = match self.inner.store.load() {
            Some(record) if is_valid(&record, now, self.inner.timeout) => {
                let id = record.session_id;
                self.inner.state.borrow_mut().current_session_id = Some(id.clone());
                self.inner.sdk.set_customer_session_id(&id);
                info!(csid = %id, "Session restored");
                InitOutcome::Restored(id)
            }
            stale => {
                if let Some(record) = stale {
                    info!(csid = %record.session_id, "Stored session expired");
                }
                InitOutcome::Started(self.start_new_session())
            }
        };

        {
            let mut state = self.inner.state.borrow_mut();
            state.initialized = true;
            state.hooks_attached = true;
        }
        self.arm_sweep();
        outcome
    }

    /// Creates a session and schedules its id for the SDK after the grace delay.
    pub fn start_new_session(&self) -> Option<String> {
        if !self.inner.sdk.is_available() {
            warn!(mode = %self.inner.sdk.mode(), "SDK not available, session not started");
            return None;
        }

        let now = self.now();
        let id = generate_csid(now);

        let sdk = Rc::clone(&self.inner.sdk);
        let pushed = id.clone();
        self.inner
            .event_loop
            .set_timeout(self.inner.config.new_session_delay(), move || {
                sdk.set_customer_session_id(&pushed);
            });

        // Failure is logged by the store; the id is still live for this page.
        let _ = self.inner.store.store(&SessionRecord::new(id.clone(), now));
        self.inner.state.borrow_mut().current_session_id = Some(id.clone());
        info!(csid = %id, "New session started");
        Some(id)
    }

    /// Refreshes `lastActivity` of a fresh stored session. Returns false when
    /// there is nothing fresh to refresh or the write failed.
    pub fn update_activity(&self) -> bool {
        let now = self.now();
        let Some(mut record) = self.inner.store.load() else {
            return false;
        };
        if !is_valid(&record, now, self.inner.timeout) {
            return false;
        }
        record.touch(now);
        self.inner.store.store(&record).is_ok()
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.inner.state.borrow().current_session_id.clone()
    }

    /// Checks `record`, or the stored record when none is given.
    pub fn is_session_valid(&self, record: Option<&SessionRecord>) -> bool {
        let now = self.now();
        match record {
            Some(record) => is_valid(record, now, self.inner.timeout),
            None => self
                .inner
                .store
                .load()
                .is_some_and(|record| is_valid(&record, now, self.inner.timeout)),
        }
    }

    /// Drops the current session and starts a replacement.
    pub fn end_session(&self) -> Option<String> {
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.initialized = false;
            state.current_session_id.take()
        };
        let _ = self.inner.store.clear();
        info!(previous = ?previous, "Session ended");

        let replacement = self.start_new_session();

        let sweep_missing = self.inner.state.borrow().sweep.is_none();
        let hooks_attached = self.inner.state.borrow().hooks_attached;
        if self.inner.config.re_arm_sweep && hooks_attached && sweep_missing && replacement.is_some()
        {
            self.arm_sweep();
        }
        replacement
    }

    pub fn handle_logout(&self) -> Option<String> {
        self.end_session()
    }

    /// Adopts an id issued by the login backend and marks the session authenticated.
    pub fn handle_login(&self, session_id: &str) -> bool {
        if session_id.trim().is_empty() {
            warn!("Login without a session id ignored");
            return false;
        }

        let now = self.now();
        self.inner.state.borrow_mut().current_session_id = Some(session_id.to_string());
        self.inner.sdk.set_customer_session_id(session_id);

        let record = match self.inner.store.load() {
            Some(mut record) => {
                record.session_id = session_id.to_string();
                record.touch(now);
                record.is_authenticated = true;
                record
            }
            None => SessionRecord {
                is_authenticated: true,
                ..SessionRecord::new(session_id, now)
            },
        };
        let _ = self.inner.store.store(&record);
        info!(csid = %session_id, "Session authenticated");
        true
    }

    /// Activity hook. Returns true when the stored session was refreshed.
    pub fn handle_page_event(&self, event: PageEvent) -> bool {
        if !self.inner.state.borrow().hooks_attached {
            debug!(?event, "Activity hooks not attached yet");
            return false;
        }
        match event {
            PageEvent::VisibilityChange { hidden: true } => false,
            PageEvent::VisibilityChange { hidden: false } | PageEvent::BeforeUnload => {
                self.update_activity()
            }
        }
    }

    pub fn stored_record(&self) -> Option<SessionRecord> {
        self.inner.store.load()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    pub fn sweep_armed(&self) -> bool {
        let sweep = self.inner.state.borrow().sweep;
        sweep.is_some_and(|id| self.inner.event_loop.is_pending(id))
    }

    fn arm_sweep(&self) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let id = self
            .inner
            .event_loop
            .set_interval(self.inner.config.sweep_interval(), move || {
                if let Some(inner) = weak.upgrade() {
                    SessionManager { inner }.sweep_tick();
                }
            });

        let previous = self.inner.state.borrow_mut().sweep.replace(id);
        if let Some(previous) = previous {
            self.inner.event_loop.clear(previous);
        }
    }

    /// Ends the session once its stored record has gone stale. Without a
    /// readable record there is nothing to expire.
    fn sweep_tick(&self) {
        let Some(record) = self.inner.store.load() else {
            debug!("No stored session to sweep");
            return;
        };
        if self.is_session_valid(Some(&record)) {
            return;
        }

        let sweep = self.inner.state.borrow_mut().sweep.take();
        if let Some(sweep) = sweep {
            self.inner.event_loop.clear(sweep);
        }
        info!("Session expired, replacing it");
        self.end_session();
    }
}
