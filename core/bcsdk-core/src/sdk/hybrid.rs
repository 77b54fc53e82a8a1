//! Hybrid mode: the native shell owns the session and the page drives `bcClient`.

use std::rc::Rc;

use bcsdk_protocol::PROTOCOL_VERSION;
use tracing::{error, info, warn};

use super::{guarded, CallOutcome, DeliveryMode, SdkGlobals, SessionSdk};

const GLOBAL: &str = "bcClient";
const CLIENT_GLOBAL: &str = "bcClient.client";

#[derive(Debug, Clone)]
pub struct HybridAdapter {
    globals: SdkGlobals,
}

impl HybridAdapter {
    pub fn new(globals: SdkGlobals) -> Self {
        HybridAdapter { globals }
    }

    /// Starts the client with the installed `bcClientConfiguration`.
    ///
    /// Both the client and its configuration must be present; either one missing
    /// is reported as unavailable with an error log, since there is nothing to
    /// retry until the vendor script loads.
    pub fn start(&self, collector_url: &str, tenant_id: &str, csid: &str) -> CallOutcome {
        let (Some(client), Some(configuration)) = (
            self.globals.bc_client(),
            self.globals.client_configuration(),
        ) else {
            error!(
                global = GLOBAL,
                operation = "start",
                "bcClientConfiguration or bcClient.start not available"
            );
            return CallOutcome::Unavailable { global: GLOBAL };
        };

        let outcome = guarded(GLOBAL, "start", Some(client), |client| {
            client.start(
                collector_url,
                tenant_id,
                csid,
                &configuration,
                PROTOCOL_VERSION,
            )
        });
        if outcome.is_delivered() {
            info!(csid, tenant_id, "Hybrid client started");
        }
        outcome
    }

    pub fn flush(&self) -> CallOutcome {
        let handle = self.globals.bc_client().and_then(|client| client.client());
        guarded(CLIENT_GLOBAL, "flush", handle, |handle| handle.flush())
    }

    pub fn pause_collection(&self) -> CallOutcome {
        guarded(GLOBAL, "pauseCollection", self.globals.bc_client(), |client| {
            client.pause_collection()
        })
    }

    pub fn resume_collection(&self) -> CallOutcome {
        guarded(GLOBAL, "resumeCollection", self.globals.bc_client(), |client| {
            client.resume_collection()
        })
    }

    /// First calls after the client reports it is running: session id, then
    /// context, then brand when one is known. Skipped as a whole when `bcClient`
    /// is missing.
    pub fn first_initial(&self, csid: &str, brand: Option<&str>, context: &str) -> Vec<CallOutcome> {
        let Some(client) = self.globals.bc_client() else {
            warn!(global = GLOBAL, operation = "firstInitial", "SDK global does not exist");
            return vec![CallOutcome::Unavailable { global: GLOBAL }];
        };

        let mut outcomes = vec![
            guarded(GLOBAL, "setCustomerSessionId", Some(Rc::clone(&client)), |client| {
                client.set_customer_session_id(csid)
            }),
            guarded(GLOBAL, "changeContext", Some(Rc::clone(&client)), |client| {
                client.change_context(context)
            }),
        ];
        if let Some(brand) = brand {
            outcomes.push(guarded(GLOBAL, "setCustomerBrand", Some(client), |client| {
                client.set_customer_brand(brand)
            }));
        }
        outcomes
    }
}

impl SessionSdk for HybridAdapter {
    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Hybrid
    }

    fn is_available(&self) -> bool {
        self.globals.bc_client().is_some()
    }

    fn set_customer_session_id(&self, csid: &str) -> CallOutcome {
        guarded(GLOBAL, "setCustomerSessionId", self.globals.bc_client(), |client| {
            client.set_customer_session_id(csid)
        })
    }

    fn change_context(&self, context: &str) -> CallOutcome {
        guarded(GLOBAL, "changeContext", self.globals.bc_client(), |client| {
            client.change_context(context)
        })
    }

    fn set_customer_brand(&self, brand: &str) -> CallOutcome {
        guarded(GLOBAL, "setCustomerBrand", self.globals.bc_client(), |client| {
            client.set_customer_brand(brand)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::sdk::{RecordingBcClient, SdkCall};
    use std::rc::Rc;

    fn installed() -> (HybridAdapter, RecordingBcClient) {
        let globals = SdkGlobals::new();
        let client = RecordingBcClient::new();
        globals.install_bc_client(Rc::new(client.clone()));
        globals.install_client_configuration(ClientConfig::default().hybrid_configuration());
        (HybridAdapter::new(globals), client)
    }

    #[test]
    fn test_start_passes_configuration_and_protocol_version() {
        let (adapter, client) = installed();
        assert!(adapter
            .start("https://wup.example.com", "dummy", "SHELL_CSID_12")
            .is_delivered());

        let starts = client.start_calls();
        assert_eq!(starts.len(), 1);
        match &starts[0] {
            SdkCall::Start {
                collector_url,
                tenant_id,
                csid,
                protocol_version,
                configuration,
            } => {
                assert_eq!(collector_url, "https://wup.example.com");
                assert_eq!(tenant_id, "dummy");
                assert_eq!(csid, "SHELL_CSID_12");
                assert_eq!(*protocol_version, 4);
                assert_eq!(configuration.log_server_url, ClientConfig::default().log_server_url);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn test_start_without_configuration_is_unavailable() {
        let globals = SdkGlobals::new();
        let client = RecordingBcClient::new();
        globals.install_bc_client(Rc::new(client.clone()));
        let adapter = HybridAdapter::new(globals);

        assert_eq!(
            adapter.start("https://wup.example.com", "dummy", "SHELL_CSID_12"),
            CallOutcome::Unavailable { global: "bcClient" }
        );
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_flush_requires_started_client() {
        let (adapter, client) = installed();
        assert_eq!(
            adapter.flush(),
            CallOutcome::Unavailable {
                global: "bcClient.client"
            }
        );

        adapter.start("https://wup.example.com", "dummy", "SHELL_CSID_12");
        assert!(adapter.flush().is_delivered());
        assert_eq!(client.calls().last(), Some(&SdkCall::Flush));
    }

    #[test]
    fn test_first_initial_order() {
        let (adapter, client) = installed();
        let outcomes = adapter.first_initial("SHELL_CSID_12", Some("gold"), "Login");
        assert!(outcomes.iter().all(CallOutcome::is_delivered));
        assert_eq!(
            client.calls(),
            vec![
                SdkCall::SetCustomerSessionId("SHELL_CSID_12".to_string()),
                SdkCall::ChangeContext("Login".to_string()),
                SdkCall::SetCustomerBrand("gold".to_string()),
            ]
        );
    }

    #[test]
    fn test_first_initial_without_client_is_skipped() {
        let adapter = HybridAdapter::new(SdkGlobals::new());
        assert_eq!(
            adapter.first_initial("SHELL_CSID_12", Some("gold"), "Login"),
            vec![CallOutcome::Unavailable { global: "bcClient" }]
        );
    }

    #[test]
    fn test_collection_toggles_and_faults() {
        let (adapter, client) = installed();
        assert!(adapter.pause_collection().is_delivered());
        assert!(adapter.resume_collection().is_delivered());

        client.fail_with("client crashed");
        assert!(matches!(
            adapter.change_context("Login"),
            CallOutcome::Failed {
                operation: "changeContext",
                ..
            }
        ));
        assert_eq!(
            client.calls(),
            vec![SdkCall::PauseCollection, SdkCall::ResumeCollection]
        );
    }
}
