//! Direct mode: the page owns the session and talks to `cdApi`.

use std::rc::Rc;

use bcsdk_protocol::{DirectConfiguration, OutboundMessage};
use tracing::{error, warn};

use super::{guarded, CallOutcome, CdApi, DeliveryMode, SdkGlobals, SessionSdk};
use crate::error::SdkFault;

const GLOBAL: &str = "cdApi";

/// Receives what `window.postMessage` would deliver.
pub trait MessageSink {
    fn post_message(&self, message: &OutboundMessage, target_origin: &str) -> Result<(), SdkFault>;
}

/// `cdApi` as the loader script defines it: every operation becomes a window
/// message to the same origin.
pub struct WindowCdApi {
    sink: Rc<dyn MessageSink>,
    origin: String,
    configuration: DirectConfiguration,
}

impl WindowCdApi {
    pub fn new(
        sink: Rc<dyn MessageSink>,
        origin: impl Into<String>,
        configuration: DirectConfiguration,
    ) -> Self {
        WindowCdApi {
            sink,
            origin: origin.into(),
            configuration,
        }
    }
}

impl CdApi for WindowCdApi {
    fn get_configurations(&self) -> Result<DirectConfiguration, SdkFault> {
        Ok(self.configuration.clone())
    }

    fn post_message(&self, message: OutboundMessage) -> Result<(), SdkFault> {
        message
            .validate()
            .map_err(|info| SdkFault::new(info.to_string()))?;
        self.sink.post_message(&message, &self.origin)
    }

    fn change_context(&self, context: &str) -> Result<(), SdkFault> {
        self.post_message(OutboundMessage::context_change(context))
    }

    fn start_new_session(&self, csid: &str) -> Result<(), SdkFault> {
        self.post_message(OutboundMessage::reset_session(csid))
    }

    fn set_customer_session_id(&self, csid: &str) -> Result<(), SdkFault> {
        self.post_message(OutboundMessage::set_csid(csid))
    }

    fn set_customer_brand(&self, brand: &str) -> Result<(), SdkFault> {
        self.post_message(OutboundMessage::set_customer_brand(brand))
    }
}

#[derive(Debug, Clone)]
pub struct DirectAdapter {
    globals: SdkGlobals,
}

impl DirectAdapter {
    pub fn new(globals: SdkGlobals) -> Self {
        DirectAdapter { globals }
    }

    /// Asks the SDK to reset its session under `csid`.
    pub fn start_new_session(&self, csid: &str) -> CallOutcome {
        guarded(GLOBAL, "startNewSession", self.globals.cd_api(), |api| {
            api.start_new_session(csid)
        })
    }

    pub fn configurations(&self) -> Option<DirectConfiguration> {
        let Some(api) = self.globals.cd_api() else {
            warn!(global = GLOBAL, operation = "getConfigurations", "SDK global does not exist");
            return None;
        };
        match api.get_configurations() {
            Ok(configuration) => Some(configuration),
            Err(fault) => {
                error!(global = GLOBAL, operation = "getConfigurations", error = %fault, "SDK call failed");
                None
            }
        }
    }
}

impl SessionSdk for DirectAdapter {
    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Direct
    }

    fn is_available(&self) -> bool {
        self.globals.cd_api().is_some()
    }

    fn set_customer_session_id(&self, csid: &str) -> CallOutcome {
        guarded(GLOBAL, "setCustomerSessionId", self.globals.cd_api(), |api| {
            api.set_customer_session_id(csid)
        })
    }

    fn change_context(&self, context: &str) -> CallOutcome {
        guarded(GLOBAL, "changeContext", self.globals.cd_api(), |api| {
            api.change_context(context)
        })
    }

    fn set_customer_brand(&self, brand: &str) -> CallOutcome {
        guarded(GLOBAL, "setCustomerBrand", self.globals.cd_api(), |api| {
            api.set_customer_brand(brand)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::sdk::RecordingSink;

    fn installed() -> (DirectAdapter, RecordingSink) {
        let globals = SdkGlobals::new();
        let sink = RecordingSink::new();
        globals.install_cd_api(Rc::new(WindowCdApi::new(
            Rc::new(sink.clone()),
            "https://bank.example",
            ClientConfig::default().direct_configuration(),
        )));
        (DirectAdapter::new(globals), sink)
    }

    #[test]
    fn test_operations_post_window_messages() {
        let (adapter, sink) = installed();

        assert!(adapter.set_customer_session_id("DEMO_1").is_delivered());
        assert!(adapter.change_context("Login").is_delivered());
        assert!(adapter.set_customer_brand("gold").is_delivered());
        assert!(adapter.start_new_session("DEMO_2").is_delivered());

        assert_eq!(
            sink.messages(),
            vec![
                OutboundMessage::set_csid("DEMO_1"),
                OutboundMessage::context_change("Login"),
                OutboundMessage::set_customer_brand("gold"),
                OutboundMessage::reset_session("DEMO_2"),
            ]
        );
        assert_eq!(sink.origins(), vec!["https://bank.example"; 4]);
    }

    #[test]
    fn test_missing_cd_api_is_unavailable() {
        let adapter = DirectAdapter::new(SdkGlobals::new());
        assert!(!adapter.is_available());
        assert_eq!(
            adapter.change_context("Login"),
            CallOutcome::Unavailable { global: "cdApi" }
        );
        assert!(adapter.configurations().is_none());
    }

    #[test]
    fn test_sink_fault_becomes_failed_outcome() {
        let (adapter, sink) = installed();
        sink.fail_with("postMessage blocked");
        match adapter.set_customer_session_id("DEMO_1") {
            CallOutcome::Failed { operation, fault } => {
                assert_eq!(operation, "setCustomerSessionId");
                assert_eq!(fault.message, "postMessage blocked");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_message_rejected_before_posting() {
        let (adapter, sink) = installed();
        assert!(matches!(
            adapter.set_customer_session_id(""),
            CallOutcome::Failed { .. }
        ));
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_configurations_from_installed_api() {
        let (adapter, _sink) = installed();
        let configuration = adapter.configurations().unwrap();
        assert_eq!(configuration.max_shadow_depth, 25);
    }
}
