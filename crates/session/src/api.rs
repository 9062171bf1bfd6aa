//! The slice of the remote API the session layer depends on

use async_trait::async_trait;
use portal_http::client::error::ClientError;
use portal_http::{ApiClient, AuthResponse, MeResponse, RegisterRequest};

/// Authentication endpoints consumed by [`SessionManager`](crate::SessionManager)
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError>;
    async fn google_login(&self, id_token: &str) -> Result<AuthResponse, ClientError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), ClientError>;
    async fn get_me(&self, access_token: &str) -> Result<MeResponse, ClientError>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        Self::login(self, email, password).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        Self::register(self, request).await
    }

    async fn google_login(&self, id_token: &str) -> Result<AuthResponse, ClientError> {
        Self::google_login(self, id_token).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        Self::refresh_token(self, refresh_token).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        Self::logout(self, refresh_token).await
    }

    async fn get_me(&self, access_token: &str) -> Result<MeResponse, ClientError> {
        Self::get_me(self, access_token).await
    }
}
