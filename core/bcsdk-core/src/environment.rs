//! Runtime classification: desktop browser, mobile browser, or embedded web-view.
//!
//! Every predicate is a pure function of [`DeviceSignals`]. Detection is heuristic;
//! a wrong answer only picks the other SDK variant, so "best effort" is the
//! contract. Missing signals read as "not detected".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{Document, IS_HYBRID_META};

static RE_IOS_PLATFORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"iPad|iPhone|iPod").unwrap());
static RE_IOS_AGENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"iPad|iPhone|iPod|iOS").unwrap());
static RE_ANDROID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)android").unwrap());
static RE_WV_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bwv\b").unwrap());

/// Globals a native shell exposes when it embeds the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBridges {
    pub react_native_webview: bool,
    pub external_notify: bool,
    pub webkit_message_handlers: bool,
    /// `<html data-wv="true">`
    pub data_wv_attribute: bool,
}

impl NativeBridges {
    pub fn any(&self) -> bool {
        self.react_native_webview
            || self.external_notify
            || self.webkit_message_handlers
            || self.data_wv_attribute
    }

    /// Builds from bridge names; unknown names are returned so callers can report them.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> (Self, Vec<String>) {
        let mut bridges = NativeBridges::default();
        let mut unknown = Vec::new();
        for name in names {
            match name {
                "react-native" | "ReactNativeWebView" => bridges.react_native_webview = true,
                "external-notify" | "external.notify" => bridges.external_notify = true,
                "webkit" | "webkit.messageHandlers" => bridges.webkit_message_handlers = true,
                "data-wv" => bridges.data_wv_attribute = true,
                other => unknown.push(other.to_string()),
            }
        }
        (bridges, unknown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSignals {
    pub user_agent: String,
    pub vendor: String,
    pub platform: String,
    pub max_touch_points: u32,
    /// Legacy IE on Windows Phone spoofs iOS agents and sets `window.MSStream`.
    pub ms_stream: bool,
    pub bridges: NativeBridges,
}

impl DeviceSignals {
    pub fn from_user_agent(user_agent: &str) -> Self {
        DeviceSignals {
            user_agent: user_agent.to_string(),
            ..Default::default()
        }
    }

    fn agent(&self) -> &str {
        if self.user_agent.is_empty() {
            &self.vendor
        } else {
            &self.user_agent
        }
    }
}

pub fn is_ios(signals: &DeviceSignals) -> bool {
    if signals.ms_stream {
        return signals.platform == "MacIntel" && signals.max_touch_points > 1;
    }
    RE_IOS_PLATFORM.is_match(&signals.platform)
        || RE_IOS_AGENT.is_match(signals.agent())
        // iPadOS 13+ reports a desktop platform
        || (signals.platform == "MacIntel" && signals.max_touch_points > 1)
}

pub fn is_android(signals: &DeviceSignals) -> bool {
    RE_ANDROID.is_match(signals.agent())
}

pub fn is_webview(signals: &DeviceSignals) -> bool {
    let agent = signals.agent();

    if is_ios(signals) && !agent.contains("Safari") {
        return true;
    }
    if RE_WV_TOKEN.is_match(agent) {
        return true;
    }
    if is_android(signals) && is_legacy_android_webview(agent) {
        return true;
    }
    signals.bridges.any()
}

/// `Android…AppleWebKit` with neither `Version` nor `Chrome` after the engine token.
fn is_legacy_android_webview(agent: &str) -> bool {
    let Some(android_at) = agent.find("Android") else {
        return false;
    };
    let after_android = &agent[android_at..];
    let Some(webkit_at) = after_android.rfind("AppleWebKit") else {
        return false;
    };
    let tail = &after_android[webkit_at..];
    !tail.contains("Version") && !tail.contains("Chrome")
}

pub fn is_mobile(signals: &DeviceSignals) -> bool {
    is_ios(signals) || is_android(signals)
}

pub fn is_desktop_browser(signals: &DeviceSignals) -> bool {
    !is_mobile(signals) && !is_webview(signals)
}

pub fn is_mobile_browser(signals: &DeviceSignals) -> bool {
    is_mobile(signals) && !is_webview(signals)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    DesktopBrowser,
    WebView,
    MobileBrowser,
}

/// Picks one class in the order pages check them: desktop, web-view, mobile.
pub fn classify(signals: &DeviceSignals) -> DeviceClass {
    if is_desktop_browser(signals) {
        DeviceClass::DesktopBrowser
    } else if is_webview(signals) {
        DeviceClass::WebView
    } else {
        DeviceClass::MobileBrowser
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub user_agent: String,
    pub is_desktop: bool,
    pub is_mobile: bool,
    pub is_web_view: bool,
    pub is_mobile_browser: bool,
    #[serde(rename = "isIOS")]
    pub is_ios: bool,
    pub is_android: bool,
    pub platform: String,
    pub vendor: String,
    pub max_touch_points: u32,
}

pub fn environment_info(signals: &DeviceSignals) -> EnvironmentInfo {
    EnvironmentInfo {
        user_agent: signals.agent().to_string(),
        is_desktop: is_desktop_browser(signals),
        is_mobile: is_mobile(signals),
        is_web_view: is_webview(signals),
        is_mobile_browser: is_mobile_browser(signals),
        is_ios: is_ios(signals),
        is_android: is_android(signals),
        platform: signals.platform.clone(),
        vendor: signals.vendor.clone(),
        max_touch_points: signals.max_touch_points,
    }
}

/// Value the loader writes into the `isHybrid` meta tag.
///
/// Coarser than [`is_webview`] on purpose: any iOS platform, Android agent or `wv`
/// token selects the hybrid client.
pub fn hybrid_meta_content(signals: &DeviceSignals) -> &'static str {
    let ios_platform = RE_IOS_PLATFORM.is_match(&signals.platform) && !signals.ms_stream;
    let hybrid =
        ios_platform || is_android(signals) || RE_WV_TOKEN.is_match(signals.agent());
    if hybrid {
        "true"
    } else {
        "false"
    }
}

pub fn inject_hybrid_meta(document: &Document, signals: &DeviceSignals) -> &'static str {
    let content = hybrid_meta_content(signals);
    document.set_meta(IS_HYBRID_META, content);
    tracing::debug!(content, "Injected isHybrid meta tag");
    content
}
