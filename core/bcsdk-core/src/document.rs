//! Read access to the hosting document: meta tags and cookies.
//!
//! The native shell (hybrid mode) and the loader script communicate with the page
//! through `<meta name=… content=…>` tags, some of which appear only after load.
//! Reads never fail; a missing tag or cookie is the empty string.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use regex::Regex;

/// Meta tag carrying `"true"`/`"false"` for the delivery mode.
pub const IS_HYBRID_META: &str = "isHybrid";

/// Default meta tag the native shell writes the session id into.
pub const CSID_META: &str = "customerSessionId";

#[derive(Default)]
struct DocumentInner {
    meta: HashMap<String, String>,
    cookie: String,
}

/// Shared handle to the page's document. Clones observe the same tags, which is
/// how a shell injecting a tag later becomes visible to a poller.
#[derive(Clone, Default)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("meta", &inner.meta)
            .field("cookie", &inner.cookie)
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_meta(&self, name: &str, content: &str) {
        self.inner
            .borrow_mut()
            .meta
            .insert(name.to_string(), content.to_string());
    }

    pub fn remove_meta(&self, name: &str) {
        self.inner.borrow_mut().meta.remove(name);
    }

    /// Content of `<meta name="{name}">`, or `""` when the tag is absent.
    pub fn metatag_content(&self, name: &str) -> String {
        self.inner
            .borrow()
            .meta
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the raw `document.cookie` string.
    pub fn set_cookie_header(&self, cookie: &str) {
        self.inner.borrow_mut().cookie = cookie.to_string();
    }

    /// Sets one cookie the way `document.cookie = "k=v"` does: the key and value are
    /// percent-encoded, an existing cookie with the same key is replaced.
    pub fn set_cookie(&self, key: &str, value: &str) {
        let encoded_key = urlencoding::encode(key).into_owned();
        let pair = format!("{}={}", encoded_key, urlencoding::encode(value));
        let mut inner = self.inner.borrow_mut();
        let mut pairs: Vec<String> = inner
            .cookie
            .split("; ")
            .filter(|p| !p.is_empty())
            .filter(|p| p.split('=').next() != Some(encoded_key.as_str()))
            .map(str::to_string)
            .collect();
        pairs.push(pair);
        inner.cookie = pairs.join("; ");
    }

    pub fn cookie_header(&self) -> String {
        self.inner.borrow().cookie.clone()
    }

    /// Decoded value of cookie `key`, or `""` when absent or not decodable.
    pub fn cookie_content(&self, key: &str) -> String {
        let encoded_key = urlencoding::encode(key);
        let pattern = format!("(?:^|; ){}=([^;]*)", regex::escape(&encoded_key));
        let Ok(re) = Regex::new(&pattern) else {
            return String::new();
        };

        let cookie = self.cookie_header();
        re.captures(&cookie)
            .and_then(|caps| caps.get(1))
            .and_then(|value| urlencoding::decode(value.as_str()).ok())
            .map(|value| value.into_owned())
            .unwrap_or_default()
    }
}
