//! SDK heartbeat monitoring.
//!
//! The SDK posts `cdHeartbeat` messages while it runs. The monitor remembers the
//! latest status and checks it on an interval for a fixed number of attempts.
//! Unhealthy results produce a [`HeartbeatReport`] for the scoring API; sending it
//! is the host's job.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bcsdk_protocol::{HeartbeatReport, HeartbeatStatus, InboundMessage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::HeartbeatConfig;
use crate::event_loop::{EventLoop, TimerId};
use crate::sdk::InboundListener;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatVerdict {
    /// No check has concluded anything yet.
    Pending,
    Healthy,
    Errors(Vec<i64>),
    /// No heartbeat arrived before the last check: the script is blocked.
    Unavailable,
}

/// Identity fields copied into every report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    pub uuid: Option<String>,
    pub customer_session_id: Option<String>,
    pub brand: Option<String>,
    pub customer_id: Option<String>,
    pub user_agent: Option<String>,
}

impl ReportContext {
    fn fill(&self, mut report: HeartbeatReport) -> HeartbeatReport {
        report.uuid = self.uuid.clone();
        report.customer_session_id = self.customer_session_id.clone();
        report.brand = self.brand.clone();
        report.customer_id = self.customer_id.clone();
        report.user_agent = self.user_agent.clone();
        report
    }
}

struct MonitorState {
    received: u32,
    last_status: Option<HeartbeatStatus>,
    attempts_left: u32,
    verdict: HeartbeatVerdict,
    context: ReportContext,
    reports: Vec<HeartbeatReport>,
    timer: Option<TimerId>,
}

struct Monitor {
    event_loop: EventLoop,
    state: RefCell<MonitorState>,
}

impl Monitor {
    fn check(&self) {
        let mut state = self.state.borrow_mut();
        state.attempts_left = state.attempts_left.saturating_sub(1);
        let last_attempt = state.attempts_left == 0;

        if last_attempt && state.received == 0 {
            warn!("No SDK heartbeat received, script blocked or unavailable");
            let report = state.context.fill(HeartbeatReport::js_unavailable());
            state.reports.push(report);
            state.verdict = HeartbeatVerdict::Unavailable;
        }

        match state.last_status.clone() {
            Some(status) if status.is_ok() => {
                info!(received = state.received, "Heartbeat status is Ok");
                state.verdict = HeartbeatVerdict::Healthy;
            }
            Some(HeartbeatStatus::Errors(codes)) => {
                for code in &codes {
                    warn!(code, "SDK heartbeat error");
                }
                let report = state.context.fill(HeartbeatReport::errors(&codes));
                state.reports.push(report);
                state.verdict = HeartbeatVerdict::Errors(codes);
            }
            Some(HeartbeatStatus::Text(text)) => {
                debug!(status = %text, "Unrecognized heartbeat status");
            }
            None => {}
        }

        let timer = if last_attempt { state.timer.take() } else { None };
        drop(state);
        if let Some(timer) = timer {
            self.event_loop.clear(timer);
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            self.event_loop.clear(timer);
        }
    }
}

/// Listens for heartbeats and runs the periodic checks. Clones share state.
#[derive(Clone)]
pub struct HeartbeatMonitor {
    monitor: Rc<Monitor>,
}

impl HeartbeatMonitor {
    pub fn start(config: &HeartbeatConfig, event_loop: EventLoop) -> Self {
        let monitor = Rc::new(Monitor {
            event_loop: event_loop.clone(),
            state: RefCell::new(MonitorState {
                received: 0,
                last_status: None,
                attempts_left: config.max_check_attempts,
                verdict: HeartbeatVerdict::Pending,
                context: ReportContext::default(),
                reports: Vec::new(),
                timer: None,
            }),
        });

        if config.max_check_attempts > 0 {
            let weak: Weak<Monitor> = Rc::downgrade(&monitor);
            let timer = event_loop.set_interval(config.interval(), move || {
                if let Some(monitor) = weak.upgrade() {
                    monitor.check();
                }
            });
            monitor.state.borrow_mut().timer = Some(timer);
        }

        HeartbeatMonitor { monitor }
    }

    pub fn set_customer_session_id(&self, csid: &str) {
        self.monitor.state.borrow_mut().context.customer_session_id = Some(csid.to_string());
    }

    pub fn set_brand(&self, brand: &str) {
        self.monitor.state.borrow_mut().context.brand = Some(brand.to_string());
    }

    pub fn set_context(&self, context: ReportContext) {
        self.monitor.state.borrow_mut().context = context;
    }

    pub fn received(&self) -> u32 {
        self.monitor.state.borrow().received
    }

    pub fn verdict(&self) -> HeartbeatVerdict {
        self.monitor.state.borrow().verdict.clone()
    }

    /// Reports produced so far, oldest first.
    pub fn reports(&self) -> Vec<HeartbeatReport> {
        self.monitor.state.borrow().reports.clone()
    }

    pub fn is_checking(&self) -> bool {
        let timer = self.monitor.state.borrow().timer;
        timer.is_some_and(|id| self.monitor.event_loop.is_pending(id))
    }
}

impl InboundListener for HeartbeatMonitor {
    fn on_message(&self, message: &InboundMessage) {
        if let InboundMessage::Heartbeat { data } = message {
            let mut state = self.monitor.state.borrow_mut();
            state.received += 1;
            state.last_status = Some(data.clone());
        }
    }
}

impl std::fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.monitor.state.borrow();
        f.debug_struct("HeartbeatMonitor")
            .field("received", &state.received)
            .field("attempts_left", &state.attempts_left)
            .field("verdict", &state.verdict)
            .finish()
    }
}
