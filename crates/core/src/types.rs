use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST {auth}/login`
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fields collected by the registration form
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RegistrationFields {
    pub username: String,
    pub email: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
    pub telefono: String,
}

impl fmt::Debug for RegistrationFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationFields")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("nombre", &self.nombre)
            .field("apellido", &self.apellido)
            .field("telefono", &self.telefono)
            .finish()
    }
}

/// Body of `POST {auth}/registro`; self-registration always creates clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub fields: RegistrationFields,
    pub rol: Role,
}

impl From<RegistrationFields> for RegisterRequest {
    fn from(fields: RegistrationFields) -> Self {
        Self {
            fields,
            rol: Role::Cliente,
        }
    }
}

/// Body of `POST {auth}/refresh`
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Identity provider answer to login, registration and refresh.
///
/// A present, non-empty `token` is the only success signal; `status` is
/// informational and its type varies between deployments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TokenResponse {
    /// The issued credential, if any
    pub fn credential(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Who is signed in, as shown by the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// [`CurrentUser`] plus credential health, for profile views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(flatten)]
    pub user: CurrentUser,
    pub token_valid: bool,
    pub seconds_remaining: i64,
}

/// Result of a successful login or renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: CurrentUser,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The provider issued a credential and it was stored
    SignedIn(Session),
    /// The account exists; the caller should route to login
    Registered { message: Option<String> },
}
