//! Common error handling utilities and conventions

use thiserror::Error;

/// Standard result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The medium refused the operation (quota exceeded, access denied, ...)
    #[error("Storage rejected the operation: {0}")]
    Rejected(String),
}
