//! Client error types

use reqwest::StatusCode;
use thiserror::Error;
use tienda_core::AuthError;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed (401 that was not recovered)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict, e.g. a duplicate catalog entry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The session ended because the credential expired and could not be renewed
    #[error("Session expired. Please sign in again.")]
    SessionExpired,

    /// The server refused the operation for this holder; the session has ended
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Request(e) => e.status(),
            Self::ServerError { status, .. } => StatusCode::from_u16(*status).ok(),
            Self::AuthenticationFailed(_) => Some(StatusCode::UNAUTHORIZED),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            Self::Conflict(_) => Some(StatusCode::CONFLICT),
            Self::PermissionDenied(_) => Some(StatusCode::FORBIDDEN),
            Self::SessionExpired | Self::Serialization(_) | Self::Configuration(_) => None,
        }
    }

    /// Whether the UI should send the user back to sign in
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::PermissionDenied(_) | Self::AuthenticationFailed(_)
        )
    }
}

impl From<ClientError> for AuthError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::SessionExpired => AuthError::SessionExpired,
            ClientError::PermissionDenied(message) => AuthError::PermissionDenied(message),
            ClientError::Request(e) => match e.status() {
                Some(status) => AuthError::Rejected(status, e.to_string()),
                None => AuthError::Transport(e.to_string()),
            },
            ClientError::Serialization(e) => AuthError::InvalidResponse(e.to_string()),
            ClientError::Configuration(message) => AuthError::Transport(message),
            other => match other.status() {
                Some(status) => AuthError::Rejected(status, other.to_string()),
                None => AuthError::Transport(other.to_string()),
            },
        }
    }
}
