use crate::error::AuthResult;
use crate::types::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};
use async_trait::async_trait;

/// Remote identity provider.
///
/// Implementations report transport failures as [`crate::AuthError::Transport`]
/// and non-success statuses as [`crate::AuthError::Rejected`]; interpreting the
/// body (token present or not) is left to the session authority.
#[async_trait(?Send)]
pub trait IdentityProvider {
    /// Issue a credential from a username and password
    async fn login(&self, request: &LoginRequest) -> AuthResult<TokenResponse>;

    /// Create an account; the answer may carry a credential
    async fn register(&self, request: &RegisterRequest) -> AuthResult<TokenResponse>;

    /// Reissue a credential from the current one
    async fn refresh(&self, request: &RefreshRequest) -> AuthResult<TokenResponse>;
}
