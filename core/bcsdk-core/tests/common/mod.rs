//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use bcsdk_core::sdk::{RecordingBcClient, RecordingSink, WindowCdApi};
use bcsdk_core::{
    ClientConfig, DirectAdapter, EventLoop, HybridAdapter, MemoryStorage, SdkGlobals,
    SessionConfig, SessionManager,
};
use chrono::{DateTime, TimeZone, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

// ─────────────────────────────────────────────────────────────────────────────
// Log capture
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Layer that keeps every event's level and message.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn count(&self, level: Level) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level)
            .count()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.clone())
            .collect()
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
        });
    }
}

/// Runs `f` with a capturing subscriber as the thread default.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, LogCapture) {
    let capture = LogCapture::default();
    let subscriber = Registry::default().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture)
}

// ─────────────────────────────────────────────────────────────────────────────
// Pages
// ─────────────────────────────────────────────────────────────────────────────

pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// A standalone tab with `cdApi` installed.
pub struct DirectPage {
    pub globals: SdkGlobals,
    pub sink: RecordingSink,
    pub storage: MemoryStorage,
    pub event_loop: EventLoop,
    pub manager: SessionManager,
}

impl DirectPage {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_storage(config, MemoryStorage::new())
    }

    pub fn with_storage(config: &SessionConfig, storage: MemoryStorage) -> Self {
        let globals = SdkGlobals::new();
        let sink = RecordingSink::new();
        globals.install_cd_api(Rc::new(WindowCdApi::new(
            Rc::new(sink.clone()),
            "https://localhost",
            ClientConfig::default().direct_configuration(),
        )));
        let event_loop = EventLoop::starting_at(epoch());
        let manager = SessionManager::new(
            config,
            Rc::new(storage.clone()),
            Rc::new(DirectAdapter::new(globals.clone())),
            event_loop.clone(),
        );
        DirectPage {
            globals,
            sink,
            storage,
            event_loop,
            manager,
        }
    }

    pub fn pushed_ids(&self) -> Vec<String> {
        self.sink
            .messages()
            .into_iter()
            .filter_map(|message| match message {
                bcsdk_protocol::OutboundMessage::SetCsid { csid } => Some(csid),
                _ => None,
            })
            .collect()
    }
}

/// A page inside the native shell with `bcClient` and its configuration installed.
pub fn hybrid_globals() -> (SdkGlobals, RecordingBcClient, HybridAdapter) {
    let globals = SdkGlobals::new();
    let client = RecordingBcClient::new();
    globals.install_bc_client(Rc::new(client.clone()));
    globals.install_client_configuration(ClientConfig::default().hybrid_configuration());
    let adapter = HybridAdapter::new(globals.clone());
    (globals, client, adapter)
}
