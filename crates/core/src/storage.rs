//! Durable key/value storage for session data
//!
//! The session store never touches a medium directly; it goes through
//! [`Storage`]. Which backend is used is decided once, when the store is built:
//!
//! - [`LocalStorage`] (wasm32): the browser's `localStorage` for the origin
//! - [`FileStorage`] (native): a JSON document on disk
//! - [`MemoryStorage`]: process-local, lost on exit
//! - [`NoStorage`]: no medium at all; reads are empty and writes vanish

use crate::error::StorageResult;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A string key/value medium
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Whether writes actually persist anywhere
    fn is_available(&self) -> bool {
        true
    }
}

/// The absent medium, for hosts without durable storage
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStorage;

impl Storage for NoStorage {
    fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::Storage;
    use crate::error::StorageResult;
    use std::collections::BTreeMap;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, PoisonError};
    use tracing::warn;

    /// Storage backed by a JSON object on disk.
    ///
    /// Every write rewrites the whole document through a temporary file and a
    /// rename, so readers never see a half-written file.
    #[derive(Debug)]
    pub struct FileStorage {
        path: PathBuf,
        lock: Mutex<()>,
    }

    impl FileStorage {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                lock: Mutex::new(()),
            }
        }

        /// Default location: `<user data dir>/portal/session.json`
        pub fn default_path() -> Option<PathBuf> {
            directories::ProjectDirs::from("", "", "portal")
                .map(|dirs| dirs.data_dir().join("session.json"))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn load(&self) -> StorageResult<BTreeMap<String, String>> {
            let content = match fs::read_to_string(&self.path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
                Err(e) => return Err(e.into()),
            };

            match serde_json::from_str(&content) {
                Ok(items) => Ok(items),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Ignoring unreadable storage file");
                    Ok(BTreeMap::new())
                }
            }
        }

        fn save(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }

            let tmp_path = self.path.with_extension("tmp");
            let mut options = OpenOptions::new();
            options.create(true).write(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }

            let mut file = options.open(&tmp_path)?;
            file.write_all(serde_json::to_string_pretty(items)?.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        }
    }

    impl Storage for FileStorage {
        fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(self.load()?.remove(key))
        }

        fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut items = self.load()?;
            items.insert(key.to_string(), value.to_string());
            self.save(&items)
        }

        fn remove_item(&self, key: &str) -> StorageResult<()> {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut items = self.load()?;
            if items.remove(key).is_some() {
                self.save(&items)?;
            }
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::{LocalStorage, detect_storage};

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{NoStorage, Storage};
    use crate::error::{StorageError, StorageResult};

    /// The origin's `localStorage`.
    ///
    /// The handle is looked up on every call, so this type holds no JS values
    /// and a page without storage degrades to empty reads.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorage;

    impl LocalStorage {
        fn storage() -> Option<web_sys::Storage> {
            web_sys::window().and_then(|w| w.local_storage().ok().flatten())
        }
    }

    fn rejected(err: &wasm_bindgen::JsValue) -> StorageError {
        StorageError::Rejected(format!("{err:?}"))
    }

    impl Storage for LocalStorage {
        fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
            match Self::storage() {
                Some(storage) => storage.get_item(key).map_err(|e| rejected(&e)),
                None => Ok(None),
            }
        }

        fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
            match Self::storage() {
                Some(storage) => storage.set_item(key, value).map_err(|e| rejected(&e)),
                None => Ok(()),
            }
        }

        fn remove_item(&self, key: &str) -> StorageResult<()> {
            match Self::storage() {
                Some(storage) => storage.remove_item(key).map_err(|e| rejected(&e)),
                None => Ok(()),
            }
        }

        fn is_available(&self) -> bool {
            Self::storage().is_some()
        }
    }

    /// `localStorage` when the host has one, the absent medium otherwise
    pub fn detect_storage() -> Box<dyn Storage> {
        if LocalStorage::storage().is_some() {
            Box::new(LocalStorage)
        } else {
            Box::new(NoStorage)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_storage_is_inert() {
        let storage = NoStorage;
        storage.set_item("key", "value").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), None);
        storage.remove_item("key").unwrap();
        assert!(!storage.is_available());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set_item("a", "1").unwrap();
        storage.set_item("a", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("a").unwrap();
        storage.remove_item("missing").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("token").unwrap(), None);
        storage.set_item("token", "abc").unwrap();
        storage.set_item("other", "xyz").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item("token").unwrap().as_deref(), Some("abc"));

        reopened.remove_item("token").unwrap();
        assert_eq!(storage.get_item("token").unwrap(), None);
        assert_eq!(storage.get_item("other").unwrap().as_deref(), Some("xyz"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_storage_recovers_from_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("token").unwrap(), None);

        storage.set_item("token", "abc").unwrap();
        assert_eq!(storage.get_item("token").unwrap().as_deref(), Some("abc"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileStorage::new(&path).set_item("token", "abc").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
