//! Portal HTTP client

pub mod auth;
pub mod error;

use error::ClientError;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const DEFAULT_USER_AGENT: &str = concat!("portal-client/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Portal API client
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request time budget
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a request builder for an unauthenticated endpoint
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Create a request builder carrying a bearer credential
    pub fn authorized(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        self.request(method, path)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
    }

    /// Execute a request and decode the JSON body
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Execute a request whose response body is irrelevant
    pub async fn execute_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        self.send(request).await.map(drop)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(response);
        }

        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("<none>")
                .to_string();
            return Err(ClientError::UnexpectedRedirect {
                status: status.as_u16(),
                location,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, &body))
    }

    /// Classify a transport failure
    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        let url = err
            .url()
            .map_or_else(|| self.base_url.clone(), ToString::to_string);

        if err.is_timeout() {
            return ClientError::Timeout {
                url,
                timeout_secs: self.timeout.as_secs(),
            };
        }

        #[cfg(not(target_arch = "wasm32"))]
        if err.is_connect() {
            return ClientError::Connection {
                url,
                message: err.to_string(),
            };
        }

        if err.is_redirect() {
            return ClientError::UnexpectedRedirect {
                status: err.status().map_or(0, |s| s.as_u16()),
                location: url,
            };
        }

        ClientError::Request(err)
    }
}

/// Builder for `ApiClient`
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        #[cfg(not(target_arch = "wasm32"))]
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        // Browsers own timeouts and redirects for fetch
        #[cfg(target_arch = "wasm32")]
        let client = ClientBuilder::new().user_agent(user_agent).build()?;

        Ok(ApiClient {
            client,
            base_url,
            timeout,
        })
    }
}
