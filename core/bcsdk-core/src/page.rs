//! Page contexts and the per-page entry flow.

use serde::Serialize;
use tracing::info;

use crate::environment::DeviceClass;
use crate::sdk::{CallOutcome, Environment};
use crate::session::{InitOutcome, SessionManager};

/// Context labels the SDK receives for each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageContext {
    Home,
    CreditCards,
    AccountOpening,
    GoldCard,
    PlatinumCard,
    Login,
    AccountDashboard,
    MakePayment,
    Internal,
}

impl PageContext {
    pub const ALL: [PageContext; 9] = [
        PageContext::Home,
        PageContext::CreditCards,
        PageContext::AccountOpening,
        PageContext::GoldCard,
        PageContext::PlatinumCard,
        PageContext::Login,
        PageContext::AccountDashboard,
        PageContext::MakePayment,
        PageContext::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageContext::Home => "Home-Page",
            PageContext::CreditCards => "New-Credit-Cards",
            PageContext::AccountOpening => "Account-Opening",
            PageContext::GoldCard => "Gold-Card",
            PageContext::PlatinumCard => "Platinum-Card",
            PageContext::Login => "Login",
            PageContext::AccountDashboard => "Account-Dashboard",
            PageContext::MakePayment => "Make-Payments",
            PageContext::Internal => "Extended-Functionality",
        }
    }

    /// Route the page is served under. Payments happen on the dashboard route.
    pub fn route(&self) -> &'static str {
        match self {
            PageContext::Home => "/",
            PageContext::CreditCards => "/credit-cards-selection",
            PageContext::AccountOpening => "/account-opening",
            PageContext::GoldCard => "/gold-card",
            PageContext::PlatinumCard => "/platinum-card",
            PageContext::Login => "/login",
            PageContext::AccountDashboard | PageContext::MakePayment => "/account-dashboard",
            PageContext::Internal => "/extended-functionality",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|context| context.as_str() == label)
    }
}

impl std::fmt::Display for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PageContext {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub device: DeviceClass,
    pub context: PageContext,
    /// `None` for web-views, where the native shell owns the session.
    pub init: Option<InitOutcome>,
    pub context_change: CallOutcome,
}

/// Runs what every page does on mount: establish the session unless the shell
/// owns it, then report the page context.
pub fn enter_page(
    device: DeviceClass,
    environment: &Environment,
    manager: &SessionManager,
    context: PageContext,
) -> PageEntry {
    let init = match device {
        DeviceClass::WebView => None,
        DeviceClass::DesktopBrowser | DeviceClass::MobileBrowser => {
            Some(manager.initialize_application())
        }
    };

    let context_change = environment.sdk().change_context(context.as_str());
    info!(
        device = ?device,
        mode = %environment.mode(),
        context = %context,
        "Page entered"
    );

    PageEntry {
        device,
        context,
        init,
        context_change,
    }
}
