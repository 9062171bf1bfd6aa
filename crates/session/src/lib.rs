//! Portal session layer
//!
//! Keeps the access/refresh token pair and the user profile in a
//! [`Storage`](portal_core::Storage) backend, refreshes the access token
//! before it lapses and hands out valid bearer credentials on demand.

pub mod api;
pub mod context;
pub mod error;
pub mod guard;
pub mod manager;
pub mod store;
mod timer;

#[cfg(test)]
mod test_support;

pub use api::AuthApi;
pub use context::{SessionAction, SessionContext, SessionState};
pub use error::SessionError;
pub use guard::{Access, check_access};
pub use manager::{Identity, SessionEndedListener, SessionManager};
pub use store::SessionStore;
