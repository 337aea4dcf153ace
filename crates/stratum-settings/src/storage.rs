#![forbid(unsafe_code)]

//! Storage backends for persisting settings across sessions.
//!
//! The registry never decides a file format. It hands a flat map of
//! string keys to [`Variant`] values to a [`StorageBackend`] and reads the
//! same shape back. Keys are the ones used by
//! [`Settings::value`](crate::Settings::value) plus the paths returned by
//! [`Settings::setting_key`](crate::Settings::setting_key).
//!
//! | Backend | Availability | Notes |
//! |---------|--------------|-------|
//! | [`MemoryStorage`] | always | Test double, lives as long as the value |
//! | [`FileStorage`] | `state-persistence` feature | One JSON object per file |

use std::cell::RefCell;
use std::collections::BTreeMap;

use stratum_core::Variant;

use crate::error::StorageResult;

/// Flat key → value snapshot exchanged with backends.
pub type SettingsMap = BTreeMap<String, Variant>;

/// A place settings are loaded from and saved to.
pub trait StorageBackend {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Read every stored entry. A backend with nothing stored yet returns an
    /// empty map, not an error.
    fn load_all(&self) -> StorageResult<SettingsMap>;

    /// Replace the stored entries with `entries`.
    fn save_all(&self, entries: &SettingsMap) -> StorageResult<()>;
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<SettingsMap>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: SettingsMap) -> Self {
        Self {
            entries: RefCell::new(entries),
        }
    }

    /// Copy of the currently stored entries.
    #[must_use]
    pub fn snapshot(&self) -> SettingsMap {
        self.entries.borrow().clone()
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn load_all(&self) -> StorageResult<SettingsMap> {
        Ok(self.entries.borrow().clone())
    }

    fn save_all(&self, entries: &SettingsMap) -> StorageResult<()> {
        *self.entries.borrow_mut() = entries.clone();
        Ok(())
    }
}

#[cfg(feature = "state-persistence")]
pub use file::FileStorage;

#[cfg(feature = "state-persistence")]
mod file {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::{SettingsMap, StorageBackend};
    use crate::error::StorageResult;

    /// JSON file backend.
    ///
    /// Saves write a sibling temporary file first and rename it over the
    /// target, so a crash mid-write leaves the previous file intact.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        path: PathBuf,
    }

    impl FileStorage {
        #[must_use]
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut name = self
                .path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            name.push(".tmp");
            self.path.with_file_name(name)
        }
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "file"
        }

        fn load_all(&self) -> StorageResult<SettingsMap> {
            match fs::read_to_string(&self.path) {
                Ok(text) if text.trim().is_empty() => Ok(SettingsMap::new()),
                Ok(text) => Ok(serde_json::from_str(&text)?),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(SettingsMap::new()),
                Err(e) => Err(e.into()),
            }
        }

        fn save_all(&self, entries: &SettingsMap) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let json = serde_json::to_string_pretty(entries)?;
            let temp = self.temp_path();
            fs::write(&temp, json)?;
            fs::rename(&temp, &self.path)?;
            Ok(())
        }
    }
}
