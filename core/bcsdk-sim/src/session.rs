//! `session`: one lifecycle action against a tab whose storage survives between
//! invocations, the way `sessionStorage` survives a reload.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use bcsdk_core::sdk::{install_sdk_globals, RecordingSink};
use bcsdk_core::{
    BridgeConfig, Document, Environment, EventLoop, FileStorage, SdkGlobals, SessionManager,
    StorageConfig, IS_HYBRID_META,
};
use clap::Subcommand;
use serde_json::json;
use tracing::info;

use crate::{emit, SimError};

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Page load: restore or create the tab's session
    Init,
    /// User activity on the page
    Activity,
    /// Adopt a backend-issued session id after login
    Login {
        #[arg(value_name = "CSID")]
        csid: String,
    },
    /// End the session and start a replacement
    Logout,
    /// Print the stored record and whether it is still fresh
    Status,
}

pub fn run(
    config: &BridgeConfig,
    action: Action,
    storage_dir: Option<PathBuf>,
    tab: &str,
    idle_secs: u64,
) -> Result<(), SimError> {
    let storage_config = match storage_dir {
        Some(dir) => StorageConfig::with_root(dir),
        None => StorageConfig::from_home()?,
    };
    let tab_file = storage_config.tab_file(tab);
    let storage = Rc::new(FileStorage::new(&tab_file));

    let document = Document::new();
    document.set_meta(IS_HYBRID_META, "false");
    let globals = SdkGlobals::new();
    let sink = RecordingSink::new();
    install_sdk_globals(&document, &globals, &config.client, Rc::new(sink.clone()));
    let environment = Environment::select(&document, &globals);

    let event_loop = EventLoop::new();
    event_loop.advance(Duration::from_secs(idle_secs));
    let manager = SessionManager::new(
        &config.session,
        storage,
        environment.sdk(),
        event_loop.clone(),
    );
    info!(tab, path = %tab_file.display(), ?action, "Running session action");

    let result = match action {
        Action::Init => json!({
            "action": "init",
            "result": manager.initialize_application(),
        }),
        Action::Activity => json!({
            "action": "activity",
            "refreshed": manager.update_activity(),
        }),
        Action::Login { csid } => json!({
            "action": "login",
            "accepted": manager.handle_login(&csid),
        }),
        Action::Logout => json!({
            "action": "logout",
            "csid": manager.handle_logout(),
        }),
        Action::Status => {
            let record = manager.stored_record();
            json!({
                "action": "status",
                "fresh": manager.is_session_valid(record.as_ref()),
                "record": record,
            })
        }
    };

    // Let the grace-delayed id push happen before reporting.
    event_loop.advance(config.session.new_session_delay());

    emit(&result)?;
    for message in sink.messages() {
        emit(&json!({ "posted": message }))?;
    }
    Ok(())
}

