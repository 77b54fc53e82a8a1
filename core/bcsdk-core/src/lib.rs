//! # bcsdk-core
//!
//! Page-side wiring for a behavioral-biometrics SDK: session lifecycle, CSID
//! acquisition for hybrid pages, and guarded adapters for both SDK variants.
//!
//! ## Design Principles
//!
//! - **Single-threaded**: everything runs on the page's [`EventLoop`]. Handles are
//!   `Rc`-based and not `Send`.
//! - **Injected collaborators**: storage, SDK globals and the clock are passed in,
//!   never looked up.
//! - **Graceful degradation**: a missing SDK, failing storage or a late shell never
//!   panics; public entry points log and return an outcome value.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bcsdk_core::{Environment, EventLoop, MemoryStorage, SessionConfig, SessionManager};
//!
//! let environment = Environment::select(&document, &globals);
//! let manager = SessionManager::new(
//!     &SessionConfig::default(),
//!     Rc::new(MemoryStorage::new()),
//!     environment.sdk(),
//!     event_loop.clone(),
//! );
//! manager.initialize_application();
//! ```

pub mod config;
pub mod csid;
pub mod document;
pub mod environment;
pub mod error;
pub mod event_loop;
pub mod heartbeat;
pub mod page;
pub mod sdk;
pub mod session;
pub mod storage;

pub use config::{load_config, BridgeConfig, ClientConfig, CsidConfig, HeartbeatConfig, SessionConfig};
pub use csid::{BootstrapHandle, BootstrapState, CsidBootstrap};
pub use document::{Document, CSID_META, IS_HYBRID_META};
pub use environment::{
    classify, environment_info, inject_hybrid_meta, DeviceClass, DeviceSignals, EnvironmentInfo,
    NativeBridges,
};
pub use error::{BridgeError, Result, SdkFault};
pub use event_loop::{EventLoop, TimerId};
pub use heartbeat::{HeartbeatMonitor, HeartbeatVerdict, ReportContext};
pub use page::{enter_page, PageContext, PageEntry};
pub use sdk::{
    CallOutcome, DeliveryMode, DirectAdapter, Environment, HybridAdapter, SdkGlobals, SessionSdk,
};
pub use session::{InitOutcome, PageEvent, SessionManager, SessionRecord, SessionStore};
pub use storage::{FileStorage, MemoryStorage, StorageConfig, TabStorage};
