//! Tienda HTTP layer
//!
//! The identity provider client that backs the session authority, and the
//! request interceptor that applies the session rules to every API call.

pub mod client;
pub mod interceptor;

pub use client::api::ApiClient;
pub use client::error::ClientError;
pub use client::identity::IdentityClient;
pub use client::{TiendaClient, TiendaClientBuilder};
pub use interceptor::Interceptor;

// Re-export the session layer so callers need one import
pub use tienda_core::{
    AuthError, AuthResult, Role, SessionAuthority, SessionConfig, TokenResponse,
};

use std::rc::Rc;
use tienda_core::{CoreError, CoreResult, KeyValueStorage, Navigator};

/// Everything a front end needs to talk to the API
#[derive(Clone)]
pub struct SessionStack {
    pub authority: SessionAuthority,
    pub api: ApiClient,
}

impl SessionStack {
    /// Wire the identity client, session authority and interceptor together
    /// over one shared HTTP client
    pub fn new(
        config: SessionConfig,
        storage: Rc<dyn KeyValueStorage>,
        navigator: Rc<dyn Navigator>,
    ) -> CoreResult<Self> {
        let client = TiendaClient::from_config(&config)
            .map_err(|e| CoreError::invalid_config(e.to_string()))?;
        let identity = IdentityClient::new(client.clone(), config.clone());
        let authority = SessionAuthority::builder(config)
            .storage(storage)
            .provider(Rc::new(identity))
            .navigator(navigator)
            .build()?;
        let api = ApiClient::new(Interceptor::new(authority.clone(), client));
        Ok(Self { authority, api })
    }
}
