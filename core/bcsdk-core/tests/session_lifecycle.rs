//! Integration tests for the session lifecycle against a direct-mode page.

mod common;

use std::rc::Rc;
use std::time::Duration;

use bcsdk_core::storage::TabStorage;
use bcsdk_core::{
    InitOutcome, MemoryStorage, PageEvent, SessionConfig, SessionRecord, SessionStore,
};
use common::{capture_logs, epoch, DirectPage};
use tracing::Level;

fn seed(storage: &MemoryStorage, record: &SessionRecord) {
    SessionStore::new(Rc::new(storage.clone()), "biocatch_session")
        .store(record)
        .unwrap();
}

#[test]
fn test_initialize_twice_stores_and_pushes_once() {
    let page = DirectPage::new(&SessionConfig::default());

    let first = page.manager.initialize_application();
    let second = page.manager.initialize_application();
    page.event_loop.advance(Duration::from_secs(1));

    assert!(matches!(first, InitOutcome::Started(Some(_))));
    assert_eq!(second, InitOutcome::AlreadyInitialized);
    assert_eq!(page.storage.len(), 1);
    assert_eq!(page.pushed_ids(), vec![first.session_id().unwrap().to_string()]);
}

#[test]
fn test_recent_session_is_restored() {
    let storage = MemoryStorage::new();
    let mut record = SessionRecord::new("DEMO_1_restor", epoch() - chrono::Duration::minutes(40));
    record.last_activity = epoch() - chrono::Duration::minutes(10);
    seed(&storage, &record);

    let page = DirectPage::with_storage(&SessionConfig::default(), storage);
    let outcome = page.manager.initialize_application();

    assert_eq!(outcome, InitOutcome::Restored("DEMO_1_restor".to_string()));
    assert_eq!(page.pushed_ids(), vec!["DEMO_1_restor".to_string()]);
    assert_eq!(page.manager.stored_record(), Some(record));
}

#[test]
fn test_stale_session_is_replaced() {
    let storage = MemoryStorage::new();
    let mut record = SessionRecord::new("DEMO_1_stale0", epoch() - chrono::Duration::minutes(60));
    record.last_activity = epoch() - chrono::Duration::minutes(31);
    seed(&storage, &record);

    let page = DirectPage::with_storage(&SessionConfig::default(), storage);
    let outcome = page.manager.initialize_application();

    let id = outcome.session_id().unwrap().to_string();
    assert!(matches!(outcome, InitOutcome::Started(_)));
    assert_ne!(id, "DEMO_1_stale0");
    let stored = page.manager.stored_record().unwrap();
    assert_eq!(stored.session_id, id);
    assert_eq!(stored.start_time, epoch());
    assert!(!stored.is_authenticated);
}

#[test]
fn test_activity_is_monotonic_and_start_time_fixed() {
    let page = DirectPage::new(&SessionConfig::default());
    page.manager.initialize_application();
    let start_time = page.manager.stored_record().unwrap().start_time;

    let mut previous = start_time;
    for step in [5, 90, 1, 600] {
        page.event_loop.advance(Duration::from_secs(step));
        assert!(page.manager.update_activity());
        let record = page.manager.stored_record().unwrap();
        assert!(record.last_activity >= previous);
        assert_eq!(record.last_activity, page.event_loop.now());
        assert_eq!(record.start_time, start_time);
        previous = record.last_activity;
    }
}

#[test]
fn test_update_activity_ignores_stale_or_missing_session() {
    let page = DirectPage::new(&SessionConfig {
        sweep_interval_secs: 3600,
        ..SessionConfig::default()
    });
    assert!(!page.manager.update_activity());

    page.manager.initialize_application();
    page.event_loop.advance(Duration::from_secs(31 * 60));
    let before = page.manager.stored_record();
    assert!(!page.manager.update_activity());
    assert_eq!(page.manager.stored_record(), before);
}

#[test]
fn test_sweep_ends_idle_session_within_one_tick_after_timeout() {
    let page = DirectPage::new(&SessionConfig::default());
    let first = page
        .manager
        .initialize_application()
        .session_id()
        .unwrap()
        .to_string();

    page.event_loop.advance(Duration::from_secs(30 * 60));
    assert_eq!(page.manager.current_session_id(), Some(first.clone()));

    page.event_loop.advance(Duration::from_secs(60));
    let replacement = page.manager.current_session_id().unwrap();
    assert_ne!(replacement, first);
    assert_eq!(page.manager.stored_record().unwrap().session_id, replacement);
    assert!(page.manager.sweep_armed());
}

#[test]
fn test_sweep_without_re_arm_stops_after_expiry() {
    let page = DirectPage::new(&SessionConfig {
        re_arm_sweep: false,
        ..SessionConfig::default()
    });
    page.manager.initialize_application();

    page.event_loop.advance(Duration::from_secs(31 * 60));
    let replacement = page.manager.current_session_id().unwrap();
    assert!(!page.manager.sweep_armed());

    page.event_loop.advance(Duration::from_secs(2 * 60 * 60));
    assert_eq!(page.manager.current_session_id(), Some(replacement));
}

#[test]
fn test_visible_page_keeps_session_alive() {
    let page = DirectPage::new(&SessionConfig::default());
    let id = page
        .manager
        .initialize_application()
        .session_id()
        .unwrap()
        .to_string();

    for _ in 0..4 {
        page.event_loop.advance(Duration::from_secs(20 * 60));
        assert!(page
            .manager
            .handle_page_event(PageEvent::VisibilityChange { hidden: false }));
    }
    assert_eq!(page.manager.current_session_id(), Some(id));
}

#[test]
fn test_logout_yields_fresh_distinct_id() {
    let page = DirectPage::new(&SessionConfig::default());
    let before = page
        .manager
        .initialize_application()
        .session_id()
        .unwrap()
        .to_string();
    page.event_loop.advance(Duration::from_millis(1));

    let after = page.manager.handle_logout().unwrap();
    assert!(!after.is_empty());
    assert_ne!(after, before);
    assert_eq!(page.manager.current_session_id(), Some(after.clone()));

    page.event_loop.advance(Duration::from_secs(1));
    assert_eq!(page.pushed_ids(), vec![before, after]);
}

#[test]
fn test_unload_refreshes_but_never_ends_session() {
    let page = DirectPage::new(&SessionConfig::default());
    let id = page
        .manager
        .initialize_application()
        .session_id()
        .unwrap()
        .to_string();
    page.event_loop.advance(Duration::from_secs(10));

    assert!(page.manager.handle_page_event(PageEvent::BeforeUnload));
    assert_eq!(page.manager.current_session_id(), Some(id.clone()));
    assert_eq!(page.manager.stored_record().unwrap().session_id, id);
}

#[test]
fn test_missing_cd_api_warns_once_and_stores_nothing() {
    let page = DirectPage::new(&SessionConfig::default());
    page.globals.remove_cd_api();

    let (outcome, logs) = capture_logs(|| page.manager.initialize_application());

    assert_eq!(outcome, InitOutcome::Started(None));
    assert!(page.storage.get_item("biocatch_session").unwrap().is_none());
    assert_eq!(logs.count(Level::WARN), 1);
    assert_eq!(logs.count(Level::ERROR), 0);
}

#[test]
fn test_failing_storage_is_logged_not_fatal() {
    let page = DirectPage::new(&SessionConfig::default());
    page.storage.set_failing(true);

    let (outcome, logs) = capture_logs(|| page.manager.initialize_application());

    assert!(matches!(outcome, InitOutcome::Started(Some(_))));
    assert!(logs.count(Level::ERROR) >= 1);
}
