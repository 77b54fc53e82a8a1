//! Logging setup: stderr always, plus a daily file under `~/.bcsdk/logs` when the
//! directory can be created.

use std::env;

use bcsdk_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "bcsdk-sim.log";

/// Installs the global subscriber. Keep the returned guard alive until exit so
/// buffered file lines are flushed.
pub fn init() -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match file_writer() {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter())
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var("BCSDK_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn file_writer() -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let logs_dir = StorageConfig::from_home().ok()?.logs_dir();
    fs_err::create_dir_all(&logs_dir).ok()?;
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
