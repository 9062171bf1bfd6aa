//! Session error types

use portal_core::StorageError;
use portal_http::ClientError;
use thiserror::Error;

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The API rejected or failed the request
    #[error(transparent)]
    Api(#[from] ClientError),

    /// The session could not be written to storage
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),

    /// No usable session exists
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl SessionError {
    /// Whether the user has to log in again
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Api(err) => err.is_auth_error(),
            Self::Storage(_) => false,
        }
    }
}
