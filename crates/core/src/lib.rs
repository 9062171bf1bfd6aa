//! Portal core types and utilities
//!
//! Everything here is transport-agnostic: the token codec, the storage
//! capability the session store persists through, input validators and the
//! layered client configuration.

pub mod config;
pub mod error;
pub mod storage;
pub mod token;
pub mod validation;

pub use config::{ApiConfig, PortalConfig, SessionConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use storage::{MemoryStorage, NoStorage, Storage};
pub use token::{Claims, decode_claims, is_expired, is_expired_at};
pub use validation::{ValidationResult, validate_email, validate_password};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
