use bcsdk_core::{
    classify, environment_info, inject_hybrid_meta, DeviceSignals, Document, NativeBridges,
};
use serde_json::json;
use tracing::warn;

use crate::{emit, SimError};

pub fn run(
    user_agent: String,
    vendor: String,
    platform: String,
    max_touch_points: u32,
    bridge_names: &[String],
) -> Result<(), SimError> {
    let (bridges, unknown) = NativeBridges::from_names(bridge_names.iter().map(String::as_str));
    for name in unknown {
        warn!(bridge = %name, "Unknown native bridge ignored");
    }

    let signals = DeviceSignals {
        user_agent,
        vendor,
        platform,
        max_touch_points,
        ms_stream: false,
        bridges,
    };
    let document = Document::new();
    let is_hybrid = inject_hybrid_meta(&document, &signals);

    emit(&json!({
        "deviceClass": classify(&signals),
        "isHybrid": is_hybrid,
        "environment": environment_info(&signals),
    }))
}
