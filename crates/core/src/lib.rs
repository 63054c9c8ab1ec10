//! Tienda core session types and utilities
//!
//! Credential storage, claim inspection, the session authority that owns
//! both, and the access guards that gate navigation on its state.

pub mod access;
pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod navigation;
pub mod provider;
pub mod role;
pub mod session;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "tests"))]
pub mod tests;

pub use access::{AccessDecision, AccessGuards, SessionState};
pub use claims::{ClaimInspector, ClaimSnapshot, Claims, DecodeError};
pub use clock::{Clock, SystemClock};
pub use config::{RouteConfig, SessionConfig};
pub use error::{AuthError, AuthResult, CoreError, CoreResult};
pub use navigation::{Navigator, NoopNavigator};
pub use provider::IdentityProvider;
pub use role::Role;
pub use session::{SessionAuthority, SessionAuthorityBuilder};
pub use store::{CredentialStore, KeyValueStorage, MemoryStorage, UnavailableStorage};
pub use types::{
    CurrentUser, LoginRequest, RefreshRequest, RegisterRequest, RegistrationFields,
    RegistrationOutcome, Session, TokenResponse, UserInfo,
};
