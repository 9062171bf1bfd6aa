//! Portal HTTP module providing the REST API client
//!
//! The client is a thin transport wrapper: it builds requests, enforces the
//! per-request time budget and turns every failure into a [`ClientError`]
//! with a message fit for display.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::{ApiClient, ApiClientBuilder};
pub use types::{AuthResponse, MeResponse, Profile, RegisterRequest, Role};
