//! Identity provider client: login, registration and credential renewal

use super::TiendaClient;
use super::error::ClientError;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tienda_core::{
    AuthError, AuthResult, IdentityProvider, LoginRequest, RefreshRequest, RegisterRequest,
    SessionConfig, TokenResponse,
};
use tracing::{debug, warn};

/// Talks to the `auth/` operations of the API.
///
/// These endpoints are reachable without a credential, so requests go out
/// without an `Authorization` header and bypass the interceptor.
#[derive(Clone)]
pub struct IdentityClient {
    client: TiendaClient,
    config: SessionConfig,
}

impl IdentityClient {
    pub fn new(client: TiendaClient, config: SessionConfig) -> Self {
        Self { client, config }
    }

    /// Build a client for the API described by `config`
    pub fn from_config(config: SessionConfig) -> Result<Self, ClientError> {
        let client = TiendaClient::from_config(&config)?;
        Ok(Self::new(client, config))
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: &B,
    ) -> AuthResult<TokenResponse> {
        let url = self.config.auth_url(operation);
        debug!(%url, operation, "Calling identity provider");

        let response = self
            .client
            .request_url(Method::POST, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(operation, error = %e, "Identity provider unreachable");
                AuthError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = rejection_message(&body).unwrap_or_else(|| status.to_string());
            warn!(operation, %status, %message, "Identity provider rejected request");
            return Err(AuthError::Rejected(status, message));
        }

        serde_json::from_slice(&body).map_err(|e| {
            warn!(operation, error = %e, "Identity provider answered with an unreadable body");
            AuthError::InvalidResponse(e.to_string())
        })
    }
}

/// Prefer the `message` field of a JSON error body, else the raw text
fn rejection_message(body: &[u8]) -> Option<String> {
    let message = serde_json::from_slice::<TokenResponse>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|m| !m.trim().is_empty());
    if message.is_some() {
        return message;
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[async_trait(?Send)]
impl IdentityProvider for IdentityClient {
    async fn login(&self, request: &LoginRequest) -> AuthResult<TokenResponse> {
        self.call("login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> AuthResult<TokenResponse> {
        self.call("registro", request).await
    }

    async fn refresh(&self, request: &RefreshRequest) -> AuthResult<TokenResponse> {
        self.call("refresh", request).await
    }
}
