//! Inbound window messages from the SDK.

use std::cell::RefCell;

use bcsdk_protocol::{parse_inbound, InboundMessage};
use serde_json::Value;
use tracing::{debug, info};

use super::HybridAdapter;

pub trait InboundListener {
    fn on_message(&self, message: &InboundMessage);
}

/// Parses one posted message and hands it to every listener.
///
/// Returns how many listeners saw it: zero for foreign or malformed messages.
pub fn dispatch_inbound(value: Value, listeners: &[&dyn InboundListener]) -> usize {
    match parse_inbound(value) {
        Ok(Some(message)) => {
            for listener in listeners {
                listener.on_message(&message);
            }
            listeners.len()
        }
        Ok(None) => 0,
        Err(err) => {
            debug!(code = %err.code, error = %err.message, "Ignoring window message");
            0
        }
    }
}

/// Session values waiting for the SDK to report it is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub csid: String,
    pub context: String,
    pub brand: Option<String>,
}

/// Applies a [`PendingSession`] on the first `starting`/`started` state change,
/// then stops listening.
pub struct StateChangeListener {
    adapter: HybridAdapter,
    pending: RefCell<Option<PendingSession>>,
}

impl StateChangeListener {
    pub fn new(adapter: HybridAdapter, pending: PendingSession) -> Self {
        StateChangeListener {
            adapter,
            pending: RefCell::new(Some(pending)),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

impl InboundListener for StateChangeListener {
    fn on_message(&self, message: &InboundMessage) {
        let InboundMessage::StateChanged { event } = message else {
            return;
        };
        if !event.is_ready() {
            debug!(state = %event.state, "SDK not ready yet");
            return;
        }

        let pending = self.pending.borrow_mut().take();
        let Some(pending) = pending else {
            return;
        };

        info!(state = %event.state, csid = %pending.csid, "SDK ready, applying session");
        let outcomes =
            self.adapter
                .first_initial(&pending.csid, pending.brand.as_deref(), &pending.context);
        if !outcomes.iter().all(|outcome| outcome.is_delivered()) {
            debug!(csid = %pending.csid, "Session not fully applied after SDK start");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{RecordingBcClient, SdkCall, SdkGlobals};
    use serde_json::json;
    use std::rc::Rc;

    fn listener() -> (StateChangeListener, RecordingBcClient) {
        let globals = SdkGlobals::new();
        let client = RecordingBcClient::new();
        globals.install_bc_client(Rc::new(client.clone()));
        let listener = StateChangeListener::new(
            HybridAdapter::new(globals),
            PendingSession {
                csid: "SHELL_CSID_12".to_string(),
                context: "Account-Dashboard".to_string(),
                brand: None,
            },
        );
        (listener, client)
    }

    #[test]
    fn test_applies_once_on_ready_state() {
        let (listener, client) = listener();

        let seen = dispatch_inbound(
            json!({"type": "cdStateChangedEvent", "event": {"state": "loading"}}),
            &[&listener],
        );
        assert_eq!(seen, 1);
        assert!(listener.is_attached());
        assert!(client.calls().is_empty());

        dispatch_inbound(
            json!({"type": "cdStateChangedEvent", "event": {"state": "started"}}),
            &[&listener],
        );
        dispatch_inbound(
            json!({"type": "cdStateChangedEvent", "event": {"state": "started"}}),
            &[&listener],
        );

        assert!(!listener.is_attached());
        assert_eq!(
            client.calls(),
            vec![
                SdkCall::SetCustomerSessionId("SHELL_CSID_12".to_string()),
                SdkCall::ChangeContext("Account-Dashboard".to_string()),
            ]
        );
    }

    #[test]
    fn test_foreign_and_malformed_messages_reach_no_listener() {
        let (listener, _client) = listener();
        assert_eq!(dispatch_inbound(json!({"type": "webpackOk"}), &[&listener]), 0);
        assert_eq!(dispatch_inbound(json!({"data": 1}), &[&listener]), 0);
        assert_eq!(
            dispatch_inbound(json!({"type": "cdHeartbeat"}), &[&listener]),
            0
        );
        assert!(listener.is_attached());
    }
}
