//! Authentication API client methods

use super::{ApiClient, ClientError};
use crate::types::{
    AuthResponse, GoogleLoginRequest, LoginRequest, MeResponse, RefreshTokenRequest,
    RegisterRequest,
};
use reqwest::Method;
use tracing::debug;

/// Primary federated login endpoint
pub const GOOGLE_LOGIN_PATH: &str = "/auth/google";
/// Older deployments mount federated login here instead
pub const GOOGLE_LOGIN_FALLBACK_PATH: &str = "/auth/google/login";

impl ApiClient {
    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let request = self
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        self.execute(request).await
    }

    /// Create an account; the response logs the new user in
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let request = self.request(Method::POST, "/auth/register").json(request);
        self.execute(request).await
    }

    /// Exchange a Google ID token for a session.
    ///
    /// Falls back to the alternate endpoint when the primary one is not found.
    pub async fn google_login(&self, id_token: &str) -> Result<AuthResponse, ClientError> {
        let body = GoogleLoginRequest {
            id_token: id_token.to_string(),
        };

        let request = self.request(Method::POST, GOOGLE_LOGIN_PATH).json(&body);
        match self.execute(request).await {
            Err(ClientError::NotFound(_)) => {
                debug!(
                    path = GOOGLE_LOGIN_FALLBACK_PATH,
                    "Federated login endpoint not found, retrying on fallback path"
                );
                let request = self
                    .request(Method::POST, GOOGLE_LOGIN_FALLBACK_PATH)
                    .json(&body);
                self.execute(request).await
            }
            result => result,
        }
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        let request = self
            .request(Method::POST, "/auth/refresh")
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            });
        self.execute(request).await
    }

    /// Revoke a refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, "/auth/logout")
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            });
        self.execute_empty(request).await
    }

    /// Get current user info (requires authentication)
    pub async fn get_me(&self, access_token: &str) -> Result<MeResponse, ClientError> {
        let request = self.authorized(Method::GET, "/auth/me", access_token);
        self.execute(request).await
    }
}
