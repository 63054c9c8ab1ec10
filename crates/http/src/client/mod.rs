//! Tienda HTTP client

pub mod api;
pub mod error;
pub mod identity;

use error::ClientError;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tienda_core::SessionConfig;

const DEFAULT_USER_AGENT: &str = concat!("tienda-client/", env!("CARGO_PKG_VERSION"));

/// Plain transport to the Tienda API.
///
/// Never attaches credentials on its own; see [`crate::Interceptor`] for the
/// credential-aware pipeline.
#[derive(Clone)]
pub struct TiendaClient {
    client: Client,
    base_url: String,
}

impl TiendaClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client for the API described by a session configuration
    pub fn from_config(config: &SessionConfig) -> Result<Self, ClientError> {
        Self::builder().base_url(config.api_base_url.clone()).build()
    }

    /// Create a new client builder
    pub fn builder() -> TiendaClientBuilder {
        TiendaClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Create a request builder for an API path, without authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Create a request builder for an absolute URL, without authentication
    pub fn request_url(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a built request as-is
    pub(crate) async fn dispatch(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, ClientError> {
        Ok(self.client.execute(request).await?)
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        read_json(response).await
    }
}

/// Decode a successful response body, or classify a failed one by status
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    } else {
        Err(error_from_response(response).await)
    }
}

pub(crate) async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let message = response.text().await.unwrap_or_else(|_| status.to_string());
    ClientError::from_status(status, message)
}

/// Builder for TiendaClient
#[derive(Default)]
pub struct TiendaClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl TiendaClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout (ignored in the browser)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<TiendaClient, ClientError> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Paths are joined with a single slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        #[cfg(not(target_arch = "wasm32"))]
        let client = {
            let mut builder = ClientBuilder::new().user_agent(user_agent);
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            builder.build()?
        };

        #[cfg(target_arch = "wasm32")]
        let client = {
            let _ = self.timeout; // Timeouts not supported on WASM
            ClientBuilder::new().user_agent(user_agent).build()?
        };

        Ok(TiendaClient { client, base_url })
    }
}
