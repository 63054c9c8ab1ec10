//! Credential-aware request pipeline
//!
//! Every outgoing API call is classified, gets the bearer credential unless
//! its endpoint is public, and is dispatched. A 403 ends the session. A 401
//! on a protected endpoint is recovered at most once through a shared
//! credential renewal.

use crate::client::TiendaClient;
use crate::client::error::ClientError;
use crate::client::error_from_response;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response, StatusCode};
use tienda_core::SessionAuthority;
use tracing::{debug, info, warn};

/// Runs requests through the session rules of the API
#[derive(Clone)]
pub struct Interceptor {
    authority: SessionAuthority,
    client: TiendaClient,
}

impl Interceptor {
    pub fn new(authority: SessionAuthority, client: TiendaClient) -> Self {
        Self { authority, client }
    }

    pub fn authority(&self) -> &SessionAuthority {
        &self.authority
    }

    pub fn client(&self) -> &TiendaClient {
        &self.client
    }

    /// Whether a request path may be called without a credential
    pub fn is_public(&self, path: &str) -> bool {
        self.authority.config().is_public_endpoint(path)
    }

    /// Send a request through the pipeline.
    ///
    /// Success responses pass through unchanged. Error statuses are turned
    /// into [`ClientError`]s after the session side effects have run.
    pub async fn send(&self, mut request: Request) -> Result<Response, ClientError> {
        let path = request.url().path().to_string();
        let public = self.is_public(&path);

        let attached = self.authority.credential().filter(|_| !public);
        if let Some(credential) = &attached {
            attach(&mut request, credential)?;
        }

        // Kept before dispatch; the body is consumed by sending
        let replay = request.try_clone();
        let method = request.method().clone();

        let response = self.client.dispatch(request).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::FORBIDDEN => {
                warn!(%method, %path, "Forbidden, ending session");
                self.authority.logout();
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(ClientError::PermissionDenied(message))
            }
            StatusCode::UNAUTHORIZED if !public => {
                self.recover(&method, &path, attached, replay).await
            }
            _ => {
                debug!(%method, %path, %status, "Request failed");
                Err(error_from_response(response).await)
            }
        }
    }

    async fn recover(
        &self,
        method: &reqwest::Method,
        path: &str,
        rejected: Option<String>,
        replay: Option<Request>,
    ) -> Result<Response, ClientError> {
        let current = self.authority.credential();
        let renewed_since = current.is_some() && current != rejected;

        if renewed_since {
            // Another request's renewal finished while this one was in flight
            debug!(%method, %path, "Credential changed since dispatch, reusing it");
        } else {
            let threshold = self.authority.config().renewal_threshold_minutes;
            if !self.authority.expiring_soon(threshold) {
                info!(%method, %path, "Unauthorized with a credential that is not near expiry, ending session");
                self.authority.logout();
                return Err(ClientError::SessionExpired);
            }

            debug!(%method, %path, "Unauthorized, renewing credential");
            if let Err(e) = self.authority.refresh().await {
                // A failed renewal has already ended the session
                info!(%method, %path, error = %e, "Credential renewal failed");
                return Err(ClientError::SessionExpired);
            }
        }

        let Some(mut retry) = replay else {
            warn!(%method, %path, "Request body cannot be replayed with the renewed credential");
            return Err(ClientError::AuthenticationFailed(
                "request could not be retried after renewing the session".into(),
            ));
        };
        let credential = self
            .authority
            .credential()
            .ok_or(ClientError::SessionExpired)?;
        attach(&mut retry, &credential)?;

        debug!(%method, %path, "Retrying with renewed credential");
        let response = self.client.dispatch(retry).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

fn attach(request: &mut Request, credential: &str) -> Result<(), ClientError> {
    let value = HeaderValue::from_str(&format!("Bearer {credential}")).map_err(|_| {
        ClientError::Configuration("stored credential is not a valid header value".into())
    })?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}
