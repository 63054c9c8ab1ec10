//! Common error types shared by the session crates

use http::StatusCode;

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Result type for session commands
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Core error types that can be shared across crates
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Storage unavailable: {message}")]
    Storage { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_error(err.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

/// Errors surfaced by session commands and the request pipeline.
///
/// `SessionExpired` and `PermissionDenied` are only ever produced after the
/// session has been logged out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The identity provider answered, but without a usable credential
    #[error("Invalid response from identity provider: {0}")]
    InvalidResponse(String),

    /// A command required a stored credential and none was present
    #[error("No credential available")]
    NoCredential,

    #[error("Session expired. Please sign in again.")]
    SessionExpired,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The identity provider rejected the call with an HTTP status
    #[error("Request rejected ({0}): {1}")]
    Rejected(StatusCode, String),

    /// The call never produced an HTTP response
    #[error("Transport error: {0}")]
    Transport(String),
}

impl AuthError {
    /// Whether this error ended the session
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::PermissionDenied(_))
    }
}
