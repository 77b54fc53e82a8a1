//! `bootstrap`: CSID polling in a hybrid page with a scripted native shell.

use std::rc::Rc;
use std::time::Duration;

use bcsdk_core::sdk::{install_sdk_globals, RecordingBcClient, RecordingSink};
use bcsdk_core::{
    BridgeConfig, CsidBootstrap, Document, EventLoop, HybridAdapter, SdkGlobals, IS_HYBRID_META,
};
use serde_json::json;
use tracing::info;

use crate::{emit, SimError};

pub fn run(
    config: &BridgeConfig,
    inject_after_ms: Option<u64>,
    csid: &str,
    realtime: bool,
) -> Result<(), SimError> {
    let document = Document::new();
    document.set_meta(IS_HYBRID_META, "true");
    let globals = SdkGlobals::new();
    install_sdk_globals(
        &document,
        &globals,
        &config.client,
        Rc::new(RecordingSink::new()),
    );
    let client = RecordingBcClient::new();
    globals.install_bc_client(Rc::new(client.clone()));

    let event_loop = EventLoop::new();
    if let Some(delay) = inject_after_ms {
        let shell_view = document.clone();
        let meta_name = config.csid.meta_name.clone();
        let value = csid.to_string();
        event_loop.set_timeout(Duration::from_millis(delay), move || {
            shell_view.set_meta(&meta_name, &value);
            info!(meta = %meta_name, "Shell injected CSID");
        });
    }

    let handle = CsidBootstrap::start(
        &config.csid,
        &config.client,
        document,
        HybridAdapter::new(globals),
        event_loop.clone(),
    );

    let window = config.csid.deadline() + config.csid.poll_interval();
    if realtime {
        event_loop.run_for(window);
    } else {
        event_loop.advance(window);
    }

    emit(&json!({
        "state": handle.state(),
        "csid": handle.acquired_csid(),
        "polls": handle.poll_count(),
    }))?;
    for call in client.calls() {
        emit(&json!({ "call": call }))?;
    }
    Ok(())
}
