//! Tab-scoped key/value storage and on-disk path management.
//!
//! [`TabStorage`] is the seam for the page's `sessionStorage`: string items that live
//! as long as the tab. Two backends ship here:
//!
//! - [`MemoryStorage`]: in-process, shared by clone, with a switch that makes every
//!   call fail (quota exceeded, storage disabled by the browser).
//! - [`FileStorage`]: one JSON file per tab, so a host process can "reload" a tab
//!   and find its items again.
//!
//! # Atomic Writes
//!
//! `FileStorage` writes through a temp file + rename so a crash mid-write never
//! leaves a half-written tab file behind.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fs_err as fs;
use tempfile::NamedTempFile;

use crate::error::{BridgeError, Result};

pub trait TabStorage {
    /// Returns `Ok(None)` when the key is not set.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<T: TabStorage + ?Sized> TabStorage for Rc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryInner {
    items: RefCell<HashMap<String, String>>,
    failing: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`BridgeError::StorageUnavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.set(failing);
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<()> {
        if self.inner.failing.get() {
            return Err(BridgeError::StorageUnavailable(
                "storage is disabled for this tab".to_string(),
            ));
        }
        Ok(())
    }
}

impl TabStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.inner.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.inner
            .items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.items.borrow_mut().remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File backend
// ─────────────────────────────────────────────────────────────────────────────

/// Items for one tab, stored as a flat JSON object in `tab_file`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    tab_file: PathBuf,
}

impl FileStorage {
    pub fn new(tab_file: &Path) -> Self {
        FileStorage {
            tab_file: tab_file.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.tab_file
    }

    fn read_items(&self, key: &str) -> Result<HashMap<String, String>> {
        let content = match fs::read_to_string(&self.tab_file) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => {
                return Err(BridgeError::StorageRead {
                    key: key.to_string(),
                    details: err.to_string(),
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content).map_err(|err| BridgeError::StorageRead {
            key: key.to_string(),
            details: format!("tab file is not valid JSON: {}", err),
        })
    }

    fn write_items(&self, key: &str, items: &HashMap<String, String>) -> Result<()> {
        let write_err = |details: String| BridgeError::StorageWrite {
            key: key.to_string(),
            details,
        };

        let parent_dir = self
            .tab_file
            .parent()
            .ok_or_else(|| write_err("tab file path has no parent directory".to_string()))?;
        fs::create_dir_all(parent_dir).map_err(|e| write_err(e.to_string()))?;

        let content = serde_json::to_string_pretty(items)
            .map_err(|e| write_err(format!("failed to serialize: {}", e)))?;

        let mut temp_file =
            NamedTempFile::new_in(parent_dir).map_err(|e| write_err(format!("temp file: {}", e)))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| write_err(e.to_string()))?;
        temp_file.flush().map_err(|e| write_err(e.to_string()))?;
        temp_file
            .persist(&self.tab_file)
            .map_err(|e| write_err(e.error.to_string()))?;
        Ok(())
    }
}

impl TabStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_items(key)?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // An unreadable tab file is replaced rather than blocking every future write.
        let mut items = self.read_items(key).unwrap_or_default();
        items.insert(key.to_string(), value.to_string());
        self.write_items(key, &items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        if !self.tab_file.exists() {
            return Ok(());
        }
        let mut items = self.read_items(key).unwrap_or_default();
        if items.remove(key).is_none() {
            return Ok(());
        }
        self.write_items(key, &items)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────────────

/// Central place for every path the bridge touches on disk.
///
/// Hosts use [`StorageConfig::from_home`] (`~/.bcsdk`); tests use
/// [`StorageConfig::with_root`] with a temp directory.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(BridgeError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(".bcsdk"),
        })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.toml (bridge settings).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to tabs/ directory (one storage file per simulated tab).
    pub fn tabs_dir(&self) -> PathBuf {
        self.root.join("tabs")
    }

    pub fn tab_file(&self, tab_id: &str) -> PathBuf {
        self.tabs_dir().join(format!("{}.json", sanitize_tab_id(tab_id)))
    }

    /// Path to logs/ directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// Keeps tab ids usable as file names.
fn sanitize_tab_id(tab_id: &str) -> String {
    let cleaned: String = tab_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
