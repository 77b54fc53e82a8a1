//! Recording stand-ins for the vendor globals.
//!
//! Used by the simulator (which has no vendor script) and by tests. Clones share
//! one log, so a test keeps a clone and inspects what the adapter did.

use std::cell::RefCell;
use std::rc::Rc;

use bcsdk_protocol::{ClientConfiguration, OutboundMessage};
use serde::Serialize;

use super::{BcClient, ClientHandle, MessageSink};
use crate::error::SdkFault;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SdkCall {
    #[serde(rename_all = "camelCase")]
    Start {
        collector_url: String,
        tenant_id: String,
        csid: String,
        configuration: ClientConfiguration,
        protocol_version: u32,
    },
    SetCustomerSessionId(String),
    ChangeContext(String),
    SetCustomerBrand(String),
    PauseCollection,
    ResumeCollection,
    Flush,
}

#[derive(Default)]
struct ClientLog {
    calls: Vec<SdkCall>,
    started: bool,
    fault: Option<String>,
}

/// `bcClient` that records every call it accepts.
///
/// After [`fail_with`](Self::fail_with) every call returns the fault and is not
/// recorded.
#[derive(Clone, Default)]
pub struct RecordingBcClient {
    log: Rc<RefCell<ClientLog>>,
}

impl RecordingBcClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.log.borrow().calls.clone()
    }

    pub fn start_calls(&self) -> Vec<SdkCall> {
        self.log
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, SdkCall::Start { .. }))
            .cloned()
            .collect()
    }

    pub fn fail_with(&self, message: &str) {
        self.log.borrow_mut().fault = Some(message.to_string());
    }

    pub fn recover(&self) {
        self.log.borrow_mut().fault = None;
    }

    fn record(&self, call: SdkCall) -> Result<(), SdkFault> {
        let mut log = self.log.borrow_mut();
        if let Some(fault) = &log.fault {
            return Err(SdkFault::new(fault.clone()));
        }
        if matches!(call, SdkCall::Start { .. }) {
            log.started = true;
        }
        log.calls.push(call);
        Ok(())
    }
}

impl BcClient for RecordingBcClient {
    fn start(
        &self,
        collector_url: &str,
        tenant_id: &str,
        csid: &str,
        configuration: &ClientConfiguration,
        protocol_version: u32,
    ) -> Result<(), SdkFault> {
        self.record(SdkCall::Start {
            collector_url: collector_url.to_string(),
            tenant_id: tenant_id.to_string(),
            csid: csid.to_string(),
            configuration: configuration.clone(),
            protocol_version,
        })
    }

    fn set_customer_session_id(&self, csid: &str) -> Result<(), SdkFault> {
        self.record(SdkCall::SetCustomerSessionId(csid.to_string()))
    }

    fn change_context(&self, context: &str) -> Result<(), SdkFault> {
        self.record(SdkCall::ChangeContext(context.to_string()))
    }

    fn set_customer_brand(&self, brand: &str) -> Result<(), SdkFault> {
        self.record(SdkCall::SetCustomerBrand(brand.to_string()))
    }

    fn pause_collection(&self) -> Result<(), SdkFault> {
        self.record(SdkCall::PauseCollection)
    }

    fn resume_collection(&self) -> Result<(), SdkFault> {
        self.record(SdkCall::ResumeCollection)
    }

    fn client(&self) -> Option<Rc<dyn ClientHandle>> {
        if self.log.borrow().started {
            Some(Rc::new(self.clone()))
        } else {
            None
        }
    }
}

impl ClientHandle for RecordingBcClient {
    fn flush(&self) -> Result<(), SdkFault> {
        self.record(SdkCall::Flush)
    }
}

#[derive(Default)]
struct SinkLog {
    posted: Vec<(OutboundMessage, String)>,
    fault: Option<String>,
}

/// Window message sink that keeps every posted message with its target origin.
#[derive(Clone, Default)]
pub struct RecordingSink {
    log: Rc<RefCell<SinkLog>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.log
            .borrow()
            .posted
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    pub fn origins(&self) -> Vec<String> {
        self.log
            .borrow()
            .posted
            .iter()
            .map(|(_, origin)| origin.clone())
            .collect()
    }

    /// Number of posted messages with the given wire `type`.
    pub fn count(&self, type_name: &str) -> usize {
        self.log
            .borrow()
            .posted
            .iter()
            .filter(|(message, _)| message.type_name() == type_name)
            .count()
    }

    pub fn fail_with(&self, message: &str) {
        self.log.borrow_mut().fault = Some(message.to_string());
    }
}

impl MessageSink for RecordingSink {
    fn post_message(&self, message: &OutboundMessage, target_origin: &str) -> Result<(), SdkFault> {
        let mut log = self.log.borrow_mut();
        if let Some(fault) = &log.fault {
            return Err(SdkFault::new(fault.clone()));
        }
        log.posted.push((message.clone(), target_origin.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_handle_appears_after_start() {
        let client = RecordingBcClient::new();
        assert!(client.client().is_none());

        let configuration = crate::config::ClientConfig::default().hybrid_configuration();
        client
            .start("https://wup.example.com", "dummy", "SHELL_CSID_12", &configuration, 4)
            .unwrap();
        assert!(client.client().is_some());
    }

    #[test]
    fn test_faulted_client_records_nothing_until_recovered() {
        let client = RecordingBcClient::new();
        client.fail_with("boom");
        assert_eq!(client.pause_collection().unwrap_err().message, "boom");
        assert!(client.calls().is_empty());

        client.recover();
        client.pause_collection().unwrap();
        assert_eq!(client.calls(), vec![SdkCall::PauseCollection]);
    }

    #[test]
    fn test_sink_counts_by_type() {
        let sink = RecordingSink::new();
        sink.post_message(&OutboundMessage::set_csid("a"), "https://x").unwrap();
        sink.post_message(&OutboundMessage::set_csid("b"), "https://x").unwrap();
        sink.post_message(&OutboundMessage::context_change("Login"), "https://x")
            .unwrap();
        assert_eq!(sink.count("cdSetCsid"), 2);
        assert_eq!(sink.count("ContextChange"), 1);
        assert_eq!(sink.count("ResetSession"), 0);
    }
}
