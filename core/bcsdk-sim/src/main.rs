//! bcsdk-sim: drives the SDK bridge against a simulated page.
//!
//! Nothing here talks to a real SDK. Globals are recording stand-ins and time is
//! the page's virtual event loop, so every run is reproducible.
//!
//! ## Subcommands
//!
//! - `detect`: classify a user agent and print the `isHybrid` value
//! - `session`: run one lifecycle action against a file-backed tab
//! - `bootstrap`: run CSID polling against a scripted shell injection

mod bootstrap;
mod detect;
mod logging;
mod session;

use std::path::{Path, PathBuf};

use bcsdk_core::{load_config, BridgeConfig, BridgeError, StorageConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Output encoding failed: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Parser)]
#[command(name = "bcsdk-sim")]
#[command(about = "Behavioral SDK bridge page simulator")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ~/.bcsdk/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the runtime from user-agent signals
    Detect {
        #[arg(long)]
        user_agent: String,

        #[arg(long, default_value = "")]
        vendor: String,

        #[arg(long, default_value = "")]
        platform: String,

        #[arg(long, default_value_t = 0)]
        max_touch_points: u32,

        /// Native bridge present on the page (react-native, external-notify, webkit, data-wv)
        #[arg(long = "bridge", value_name = "NAME")]
        bridges: Vec<String>,
    },

    /// Run one session lifecycle action in a direct-mode tab
    Session {
        #[command(subcommand)]
        action: session::Action,

        /// Directory holding tab storage (defaults to ~/.bcsdk)
        #[arg(long, global = true, value_name = "DIR")]
        storage_dir: Option<PathBuf>,

        /// Tab identifier; each tab has its own storage file
        #[arg(long, global = true, default_value = "default")]
        tab: String,

        /// Seconds the page sat idle before the action
        #[arg(long, global = true, default_value_t = 0)]
        idle_secs: u64,
    },

    /// Poll for the shell-injected CSID in a hybrid page
    Bootstrap {
        /// Milliseconds until the shell injects the CSID meta tag (never if omitted)
        #[arg(long)]
        inject_after_ms: Option<u64>,

        /// Value the shell injects
        #[arg(long, default_value = "SHELL_CSID_0001")]
        csid: String,

        /// Wait in real time instead of advancing virtual time
        #[arg(long)]
        realtime: bool,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "bcsdk-sim config unusable");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Detect {
            user_agent,
            vendor,
            platform,
            max_touch_points,
            bridges,
        } => detect::run(user_agent, vendor, platform, max_touch_points, &bridges),
        Commands::Session {
            action,
            storage_dir,
            tab,
            idle_secs,
        } => session::run(&config, action, storage_dir, &tab, idle_secs),
        Commands::Bootstrap {
            inject_after_ms,
            csid,
            realtime,
        } => bootstrap::run(&config, inject_after_ms, &csid, realtime),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "bcsdk-sim failed");
        std::process::exit(1);
    }
}

/// Explicit paths must load; the default path falls back to defaults with a warning.
fn resolve_config(explicit: Option<&Path>) -> Result<BridgeConfig, SimError> {
    if let Some(path) = explicit {
        return Ok(load_config(path)?);
    }

    let path = match StorageConfig::from_home() {
        Ok(storage) => storage.config_file(),
        Err(e) => {
            tracing::warn!(error = %e, "Using default configuration");
            return Ok(BridgeConfig::default());
        }
    };
    match load_config(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable configuration, using defaults");
            Ok(BridgeConfig::default())
        }
    }
}

/// Prints one JSON value per line on stdout.
pub(crate) fn emit(value: &impl serde::Serialize) -> Result<(), SimError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
