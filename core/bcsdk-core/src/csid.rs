//! CSID acquisition for hybrid pages.
//!
//! The native shell writes the session id into a meta tag some time after the
//! page loads. The bootstrap polls for it, starts the hybrid client with it once
//! it looks like a real id, and gives up after a deadline:
//!
//! ```text
//! Polling ──(tag content > min_len chars)──▶ Found     ─▶ stopped
//!    │
//!    └──────────(deadline elapsed)────────▶ TimedOut  ─▶ stopped
//! ```
//!
//! Both timers are released together whichever way the bootstrap stops, and when
//! the last handle is dropped.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, CsidConfig};
use crate::document::Document;
use crate::event_loop::{EventLoop, TimerId};
use crate::sdk::HybridAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    Polling,
    Found,
    TimedOut,
    Cancelled,
}

impl BootstrapState {
    pub fn is_stopped(&self) -> bool {
        !matches!(self, BootstrapState::Polling)
    }
}

struct Timers {
    poll: Option<TimerId>,
    deadline: Option<TimerId>,
}

struct Bootstrap {
    config: CsidConfig,
    client: ClientConfig,
    document: Document,
    adapter: HybridAdapter,
    event_loop: EventLoop,
    state: RefCell<BootstrapState>,
    csid: RefCell<Option<String>>,
    polls: RefCell<u32>,
    timers: RefCell<Timers>,
}

impl Bootstrap {
    fn poll(&self) {
        if self.state.borrow().is_stopped() {
            return;
        }
        *self.polls.borrow_mut() += 1;

        let content = self.document.metatag_content(&self.config.meta_name);
        if content.chars().count() <= self.config.min_len {
            debug!(
                meta = %self.config.meta_name,
                len = content.chars().count(),
                "CSID not injected yet"
            );
            return;
        }

        let csid = content.trim().to_string();
        *self.state.borrow_mut() = BootstrapState::Found;
        *self.csid.borrow_mut() = Some(csid.clone());
        self.release_timers();

        info!(csid = %csid, polls = *self.polls.borrow(), "CSID found");
        self.adapter
            .start(&self.client.collector_url, &self.client.tenant_id, &csid);
    }

    fn expire(&self) {
        if self.state.borrow().is_stopped() {
            return;
        }
        *self.state.borrow_mut() = BootstrapState::TimedOut;
        self.release_timers();
        warn!(
            meta = %self.config.meta_name,
            deadline_ms = self.config.deadline_ms,
            "CSID not found before deadline, continuing without session id"
        );
    }

    fn release_timers(&self) {
        let (poll, deadline) = {
            let mut timers = self.timers.borrow_mut();
            (timers.poll.take(), timers.deadline.take())
        };
        for id in poll.into_iter().chain(deadline) {
            self.event_loop.clear(id);
        }
    }
}

impl Drop for Bootstrap {
    fn drop(&mut self) {
        let timers = self.timers.get_mut();
        for id in timers.poll.take().into_iter().chain(timers.deadline.take()) {
            self.event_loop.clear(id);
        }
    }
}

pub struct CsidBootstrap;

impl CsidBootstrap {
    /// Starts polling `document` for the CSID meta tag.
    pub fn start(
        config: &CsidConfig,
        client: &ClientConfig,
        document: Document,
        adapter: HybridAdapter,
        event_loop: EventLoop,
    ) -> BootstrapHandle {
        let bootstrap = Rc::new(Bootstrap {
            config: config.clone(),
            client: client.clone(),
            document,
            adapter,
            event_loop: event_loop.clone(),
            state: RefCell::new(BootstrapState::Polling),
            csid: RefCell::new(None),
            polls: RefCell::new(0),
            timers: RefCell::new(Timers {
                poll: None,
                deadline: None,
            }),
        });

        let weak: Weak<Bootstrap> = Rc::downgrade(&bootstrap);
        let poll = event_loop.set_interval(config.poll_interval(), move || {
            if let Some(bootstrap) = weak.upgrade() {
                bootstrap.poll();
            }
        });

        let weak: Weak<Bootstrap> = Rc::downgrade(&bootstrap);
        let deadline = event_loop.set_timeout(config.deadline(), move || {
            if let Some(bootstrap) = weak.upgrade() {
                bootstrap.expire();
            }
        });

        {
            let mut timers = bootstrap.timers.borrow_mut();
            timers.poll = Some(poll);
            timers.deadline = Some(deadline);
        }
        debug!(
            meta = %config.meta_name,
            interval_ms = config.poll_interval_ms,
            deadline_ms = config.deadline_ms,
            "CSID polling started"
        );

        BootstrapHandle { bootstrap }
    }
}

/// Owner's view of a running bootstrap. Dropping every handle stops it.
#[derive(Clone)]
pub struct BootstrapHandle {
    bootstrap: Rc<Bootstrap>,
}

impl BootstrapHandle {
    pub fn state(&self) -> BootstrapState {
        *self.bootstrap.state.borrow()
    }

    pub fn acquired_csid(&self) -> Option<String> {
        self.bootstrap.csid.borrow().clone()
    }

    pub fn poll_count(&self) -> u32 {
        *self.bootstrap.polls.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.state().is_stopped()
    }

    /// Stops polling without acquiring anything. No-op once stopped.
    pub fn cancel(&self) {
        if self.is_stopped() {
            return;
        }
        *self.bootstrap.state.borrow_mut() = BootstrapState::Cancelled;
        self.bootstrap.release_timers();
        debug!("CSID polling cancelled");
    }
}

impl std::fmt::Debug for BootstrapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapHandle")
            .field("state", &self.state())
            .field("csid", &self.acquired_csid())
            .field("polls", &self.poll_count())
            .finish()
    }
}
