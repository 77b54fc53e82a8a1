//! Integration tests for CSID acquisition on hybrid pages.

mod common;

use std::time::Duration;

use bcsdk_core::sdk::SdkCall;
use bcsdk_core::{
    BootstrapState, ClientConfig, CsidBootstrap, CsidConfig, Document, EventLoop, CSID_META,
};
use common::{capture_logs, epoch, hybrid_globals};
use tracing::Level;

#[test]
fn test_csid_found_on_first_tick_after_injection() {
    let (_globals, client, adapter) = hybrid_globals();
    let document = Document::new();
    let event_loop = EventLoop::starting_at(epoch());
    let handle = CsidBootstrap::start(
        &CsidConfig::default(),
        &ClientConfig::default(),
        document.clone(),
        adapter,
        event_loop.clone(),
    );

    event_loop.advance(Duration::from_secs(3));
    assert_eq!(handle.poll_count(), 3);
    assert_eq!(handle.state(), BootstrapState::Polling);

    document.set_meta(CSID_META, "ABCDEF123456");
    event_loop.advance(Duration::from_secs(1));

    assert_eq!(handle.state(), BootstrapState::Found);
    assert_eq!(handle.poll_count(), 4);
    assert_eq!(handle.acquired_csid().as_deref(), Some("ABCDEF123456"));

    let starts = client.start_calls();
    assert_eq!(starts.len(), 1);
    assert!(matches!(
        &starts[0],
        SdkCall::Start { csid, protocol_version: 4, .. } if csid == "ABCDEF123456"
    ));

    event_loop.advance(Duration::from_secs(30));
    assert_eq!(handle.poll_count(), 4);
    assert_eq!(client.start_calls().len(), 1);
    assert_eq!(event_loop.pending_count(), 0);
}

#[test]
fn test_csid_timeout_warns_once_and_never_starts() {
    let (_globals, client, adapter) = hybrid_globals();
    let document = Document::new();
    let event_loop = EventLoop::starting_at(epoch());

    let (handle, logs) = capture_logs(|| {
        let handle = CsidBootstrap::start(
            &CsidConfig::default(),
            &ClientConfig::default(),
            document.clone(),
            adapter,
            event_loop.clone(),
        );
        event_loop.advance(Duration::from_secs(60));
        handle
    });

    assert_eq!(handle.state(), BootstrapState::TimedOut);
    assert!(handle.is_stopped());
    assert!(client.start_calls().is_empty());
    assert_eq!(logs.count(Level::WARN), 1);
    assert_eq!(event_loop.pending_count(), 0);
    assert!(handle.poll_count() <= 10);
}

#[test]
fn test_csid_late_injection_after_deadline_is_ignored() {
    let (_globals, client, adapter) = hybrid_globals();
    let document = Document::new();
    let event_loop = EventLoop::starting_at(epoch());
    let handle = CsidBootstrap::start(
        &CsidConfig::default(),
        &ClientConfig::default(),
        document.clone(),
        adapter,
        event_loop.clone(),
    );

    event_loop.advance(Duration::from_millis(10_500));
    document.set_meta(CSID_META, "ABCDEF123456");
    event_loop.advance(Duration::from_secs(5));

    assert_eq!(handle.state(), BootstrapState::TimedOut);
    assert_eq!(handle.acquired_csid(), None);
    assert!(client.start_calls().is_empty());
}

#[test]
fn test_csid_custom_meta_name_and_cadence() {
    let (_globals, client, adapter) = hybrid_globals();
    let document = Document::new();
    let event_loop = EventLoop::starting_at(epoch());
    let config = CsidConfig {
        meta_name: "shellSessionId".to_string(),
        poll_interval_ms: 250,
        deadline_ms: 2_000,
        min_len: 4,
    };
    let handle = CsidBootstrap::start(
        &config,
        &ClientConfig::default(),
        document.clone(),
        adapter,
        event_loop.clone(),
    );

    document.set_meta(CSID_META, "ABCDEF123456");
    event_loop.advance(Duration::from_millis(500));
    assert_eq!(handle.state(), BootstrapState::Polling);

    document.set_meta("shellSessionId", "XY12Z");
    event_loop.advance(Duration::from_millis(250));
    assert_eq!(handle.state(), BootstrapState::Found);
    assert_eq!(handle.poll_count(), 3);
    assert_eq!(client.start_calls().len(), 1);
}

#[test]
fn test_csid_found_without_client_logs_error() {
    let (globals, client, adapter) = hybrid_globals();
    globals.remove_bc_client();
    let document = Document::new();
    document.set_meta(CSID_META, "ABCDEF123456");
    let event_loop = EventLoop::starting_at(epoch());

    let (handle, logs) = capture_logs(|| {
        let handle = CsidBootstrap::start(
            &CsidConfig::default(),
            &ClientConfig::default(),
            document.clone(),
            adapter,
            event_loop.clone(),
        );
        event_loop.advance(Duration::from_secs(1));
        handle
    });

    assert_eq!(handle.state(), BootstrapState::Found);
    assert_eq!(logs.count(Level::ERROR), 1);
    assert!(client.calls().is_empty());
}

#[test]
fn test_csid_unbounded_deadline_keeps_polling() {
    let (_globals, client, adapter) = hybrid_globals();
    let document = Document::new();
    let event_loop = EventLoop::starting_at(epoch());
    let config = CsidConfig {
        deadline_ms: u64::MAX / 2,
        ..CsidConfig::default()
    };
    let handle = CsidBootstrap::start(
        &config,
        &ClientConfig::default(),
        document.clone(),
        adapter,
        event_loop.clone(),
    );

    event_loop.advance(Duration::from_secs(60));
    assert_eq!(handle.state(), BootstrapState::Polling);
    assert_eq!(handle.poll_count(), 60);

    document.set_meta(CSID_META, "ABCDEF123456");
    event_loop.advance(Duration::from_secs(1));
    assert_eq!(handle.state(), BootstrapState::Found);
    assert_eq!(client.start_calls().len(), 1);
}
