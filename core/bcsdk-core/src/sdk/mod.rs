//! SDK globals and the adapters that call them.
//!
//! The vendor SDK is loaded by a separate script and shows up as window globals:
//! `cdApi` in direct mode, `bcClient` (+ `bcClientConfiguration`) in hybrid mode.
//! The collaborator traits ([`CdApi`], [`BcClient`], [`ClientHandle`]) describe those
//! objects; [`SdkGlobals`] holds whichever are currently installed.
//!
//! Adapters wrap the globals behind [`SessionSdk`]. Every adapter call is guarded:
//!
//! - global missing → one `warn!`, [`CallOutcome::Unavailable`]
//! - the SDK returns a fault → one `error!`, [`CallOutcome::Failed`]
//!
//! Nothing propagates to the caller; outcomes exist so tests and hosts can see
//! what happened without inspecting logs.

mod direct;
mod hybrid;
mod listener;
mod loader;
mod stubs;

use std::cell::RefCell;
use std::rc::Rc;

use bcsdk_protocol::{ClientConfiguration, DirectConfiguration, OutboundMessage};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::document::{Document, IS_HYBRID_META};
use crate::error::{BridgeError, SdkFault};

pub use direct::{DirectAdapter, MessageSink, WindowCdApi};
pub use hybrid::HybridAdapter;
pub use listener::{dispatch_inbound, InboundListener, PendingSession, StateChangeListener};
pub use loader::install_sdk_globals;
pub use stubs::{RecordingBcClient, RecordingSink, SdkCall};

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ─────────────────────────────────────────────────────────────────────────────

/// The direct-mode `window.cdApi` object.
pub trait CdApi {
    fn get_configurations(&self) -> Result<DirectConfiguration, SdkFault>;
    fn post_message(&self, message: OutboundMessage) -> Result<(), SdkFault>;
    fn change_context(&self, context: &str) -> Result<(), SdkFault>;
    fn start_new_session(&self, csid: &str) -> Result<(), SdkFault>;
    fn set_customer_session_id(&self, csid: &str) -> Result<(), SdkFault>;
    fn set_customer_brand(&self, brand: &str) -> Result<(), SdkFault>;
}

/// The hybrid-mode `window.bcClient` object.
pub trait BcClient {
    fn start(
        &self,
        collector_url: &str,
        tenant_id: &str,
        csid: &str,
        configuration: &ClientConfiguration,
        protocol_version: u32,
    ) -> Result<(), SdkFault>;
    fn set_customer_session_id(&self, csid: &str) -> Result<(), SdkFault>;
    fn change_context(&self, context: &str) -> Result<(), SdkFault>;
    fn set_customer_brand(&self, brand: &str) -> Result<(), SdkFault>;
    fn pause_collection(&self) -> Result<(), SdkFault>;
    fn resume_collection(&self) -> Result<(), SdkFault>;

    /// Inner client handle; only present once the client has started.
    fn client(&self) -> Option<Rc<dyn ClientHandle>>;
}

/// `bcClient.client`
pub trait ClientHandle {
    fn flush(&self) -> Result<(), SdkFault>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Window slots
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Slots {
    cd_api: Option<Rc<dyn CdApi>>,
    bc_client: Option<Rc<dyn BcClient>>,
    client_configuration: Option<ClientConfiguration>,
}

/// The window's SDK globals. Clones share slots, so a script installing a global
/// later is seen by adapters created earlier.
#[derive(Clone, Default)]
pub struct SdkGlobals {
    slots: Rc<RefCell<Slots>>,
}

impl std::fmt::Debug for SdkGlobals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.borrow();
        f.debug_struct("SdkGlobals")
            .field("cd_api", &slots.cd_api.is_some())
            .field("bc_client", &slots.bc_client.is_some())
            .field("client_configuration", &slots.client_configuration.is_some())
            .finish()
    }
}

impl SdkGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_cd_api(&self, cd_api: Rc<dyn CdApi>) {
        self.slots.borrow_mut().cd_api = Some(cd_api);
    }

    pub fn remove_cd_api(&self) {
        self.slots.borrow_mut().cd_api = None;
    }

    pub fn cd_api(&self) -> Option<Rc<dyn CdApi>> {
        self.slots.borrow().cd_api.clone()
    }

    pub fn install_bc_client(&self, bc_client: Rc<dyn BcClient>) {
        self.slots.borrow_mut().bc_client = Some(bc_client);
    }

    pub fn remove_bc_client(&self) {
        self.slots.borrow_mut().bc_client = None;
    }

    pub fn bc_client(&self) -> Option<Rc<dyn BcClient>> {
        self.slots.borrow().bc_client.clone()
    }

    pub fn install_client_configuration(&self, configuration: ClientConfiguration) {
        self.slots.borrow_mut().client_configuration = Some(configuration);
    }

    pub fn client_configuration(&self) -> Option<ClientConfiguration> {
        self.slots.borrow().client_configuration.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Common capability
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Direct,
    Hybrid,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Direct => "direct",
            DeliveryMode::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Delivered,
    Unavailable { global: &'static str },
    Failed { operation: &'static str, fault: SdkFault },
}

impl CallOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, CallOutcome::Delivered)
    }

    /// For hosts that want `?`: the already-logged outcome as a [`BridgeError`].
    pub fn into_result(self) -> crate::error::Result<()> {
        match self {
            CallOutcome::Delivered => Ok(()),
            CallOutcome::Unavailable { global } => Err(BridgeError::SdkMissing {
                global: global.to_string(),
            }),
            CallOutcome::Failed { operation, fault } => Err(BridgeError::SdkCall {
                operation: operation.to_string(),
                source: fault,
            }),
        }
    }
}

/// Operations both SDK variants support. Callers program against this, not the
/// concrete adapter.
pub trait SessionSdk {
    fn mode(&self) -> DeliveryMode;

    /// True when the SDK's root global is installed.
    fn is_available(&self) -> bool;

    fn set_customer_session_id(&self, csid: &str) -> CallOutcome;
    fn change_context(&self, context: &str) -> CallOutcome;
    fn set_customer_brand(&self, brand: &str) -> CallOutcome;
}

pub(crate) fn guarded<T: ?Sized>(
    global: &'static str,
    operation: &'static str,
    target: Option<Rc<T>>,
    call: impl FnOnce(&T) -> Result<(), SdkFault>,
) -> CallOutcome {
    let Some(target) = target else {
        warn!(global, operation, "SDK global does not exist");
        return CallOutcome::Unavailable { global };
    };

    match call(target.as_ref()) {
        Ok(()) => {
            debug!(global, operation, "SDK call delivered");
            CallOutcome::Delivered
        }
        Err(fault) => {
            error!(global, operation, error = %fault, "SDK call failed");
            CallOutcome::Failed { operation, fault }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment
// ─────────────────────────────────────────────────────────────────────────────

/// The SDK variant active on this page, chosen once at startup.
#[derive(Debug, Clone)]
pub enum Environment {
    Direct(DirectAdapter),
    Hybrid(HybridAdapter),
}

impl Environment {
    /// `isHybrid == "false"` selects direct mode; anything else (including a missing
    /// tag) selects the hybrid client.
    pub fn select(document: &Document, globals: &SdkGlobals) -> Self {
        if document.metatag_content(IS_HYBRID_META) == "false" {
            Environment::Direct(DirectAdapter::new(globals.clone()))
        } else {
            Environment::Hybrid(HybridAdapter::new(globals.clone()))
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self {
            Environment::Direct(_) => DeliveryMode::Direct,
            Environment::Hybrid(_) => DeliveryMode::Hybrid,
        }
    }

    pub fn sdk(&self) -> Rc<dyn SessionSdk> {
        match self {
            Environment::Direct(adapter) => Rc::new(adapter.clone()),
            Environment::Hybrid(adapter) => Rc::new(adapter.clone()),
        }
    }

    pub fn as_direct(&self) -> Option<&DirectAdapter> {
        match self {
            Environment::Direct(adapter) => Some(adapter),
            Environment::Hybrid(_) => None,
        }
    }

    pub fn as_hybrid(&self) -> Option<&HybridAdapter> {
        match self {
            Environment::Hybrid(adapter) => Some(adapter),
            Environment::Direct(_) => None,
        }
    }
}
