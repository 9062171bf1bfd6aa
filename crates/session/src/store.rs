//! Persistent session state: access token, refresh token and profile
//!
//! Each entry is read and written independently under a fixed key. Reads never
//! fail: a medium error or a corrupted profile is logged and reported as
//! absence, and the corrupted profile entry is removed.

use portal_core::{NoStorage, Storage, StorageResult};
use portal_http::{AuthResponse, Profile};
use std::sync::Arc;
use tracing::warn;

pub const ACCESS_TOKEN_KEY: &str = "portal.access_token";
pub const REFRESH_TOKEN_KEY: &str = "portal.refresh_token";
pub const USER_KEY: &str = "portal.user";

/// Typed view over the session entries of a [`Storage`]
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// A store for hosts without durable storage; every read is empty
    pub fn unavailable() -> Self {
        Self::new(Arc::new(NoStorage))
    }

    /// Whether writes persist anywhere
    pub fn is_available(&self) -> bool {
        self.storage.is_available()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set_item(ACCESS_TOKEN_KEY, token)
    }

    pub fn clear_access_token(&self) -> StorageResult<()> {
        self.storage.remove_item(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set_item(REFRESH_TOKEN_KEY, token)
    }

    pub fn clear_refresh_token(&self) -> StorageResult<()> {
        self.storage.remove_item(REFRESH_TOKEN_KEY)
    }

    /// Stored profile; a corrupted entry is deleted and reported as absent
    pub fn user(&self) -> Option<Profile> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Discarding corrupted stored profile");
                if let Err(e) = self.storage.remove_item(USER_KEY) {
                    warn!(error = %e, "Failed to remove corrupted profile");
                }
                None
            }
        }
    }

    pub fn set_user(&self, user: &Profile) -> StorageResult<()> {
        let serialized = serde_json::to_string(user)?;
        self.storage.set_item(USER_KEY, &serialized)
    }

    pub fn clear_user(&self) -> StorageResult<()> {
        self.storage.remove_item(USER_KEY)
    }

    /// Write tokens and profile from a login or refresh response
    pub fn persist(&self, response: &AuthResponse) -> StorageResult<()> {
        self.set_access_token(&response.access_token)?;
        self.set_refresh_token(&response.refresh_token)?;
        self.set_user(&response.user)
    }

    /// Remove every session entry.
    ///
    /// All removals are attempted; the first failure is returned.
    pub fn clear(&self) -> StorageResult<()> {
        let results = [
            self.clear_access_token(),
            self.clear_refresh_token(),
            self.clear_user(),
        ];
        results.into_iter().collect()
    }
}
