//! Shared fixtures for unit tests

use crate::store::SessionStore;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use portal_core::MemoryStorage;
use portal_http::{AuthResponse, Profile, Role};
use std::sync::Arc;

/// An unsigned JWT-shaped token expiring `secs` from now
pub fn token_expiring_in(secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}

pub fn expired_token() -> String {
    token_expiring_in(-60)
}

pub fn profile() -> Profile {
    Profile {
        id: "u1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        date_of_birth: None,
        role: Role::Client,
        created_at: None,
        updated_at: None,
    }
}

pub fn auth_response(access_token: &str, refresh_token: &str) -> AuthResponse {
    AuthResponse {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        user: profile(),
        permissions: vec!["dashboard:view".to_string()],
    }
}

pub fn memory_store() -> (Arc<MemoryStorage>, SessionStore) {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::new(storage.clone());
    (storage, store)
}
