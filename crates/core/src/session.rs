//! Session authority: the one owner of the stored credential
//!
//! Queries are synchronous reads over the credential store. Commands talk to
//! the identity provider and are the only code paths that write the store.

use crate::access::SessionState;
use crate::claims::{self, ClaimInspector, ClaimSnapshot, Claims};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult, CoreError, CoreResult};
use crate::navigation::{Navigator, NoopNavigator};
use crate::provider::IdentityProvider;
use crate::role::Role;
use crate::store::{CredentialStore, KeyValueStorage, MemoryStorage};
use crate::types::{
    CurrentUser, LoginRequest, RefreshRequest, RegisterRequest, RegistrationFields,
    RegistrationOutcome, Session, UserInfo,
};
use chrono::{DateTime, Utc};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

type PendingRenewal = Shared<LocalBoxFuture<'static, AuthResult<Session>>>;

struct Inner {
    store: CredentialStore,
    provider: Rc<dyn IdentityProvider>,
    navigator: Rc<dyn Navigator>,
    clock: Rc<dyn Clock>,
    config: SessionConfig,
    /// Bumped on every store write or clear; renewals started under an older
    /// generation are discarded
    generation: Cell<u64>,
    renewal_seq: Cell<u64>,
    pending_renewal: RefCell<Option<(u64, PendingRenewal)>>,
}

/// Handle to the session authority. Clones share the same session.
#[derive(Clone)]
pub struct SessionAuthority {
    inner: Rc<Inner>,
}

/// Builder for [`SessionAuthority`]
pub struct SessionAuthorityBuilder {
    config: SessionConfig,
    storage: Option<Rc<dyn KeyValueStorage>>,
    provider: Option<Rc<dyn IdentityProvider>>,
    navigator: Option<Rc<dyn Navigator>>,
    clock: Option<Rc<dyn Clock>>,
}

impl SessionAuthorityBuilder {
    /// Set the origin storage (defaults to in-memory storage)
    pub fn storage(mut self, storage: Rc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the identity provider
    pub fn provider(mut self, provider: Rc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the navigator used to reach the login page
    pub fn navigator(mut self, navigator: Rc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the clock (defaults to the system clock)
    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the authority and hydrate it from any persisted credential
    pub fn build(self) -> CoreResult<SessionAuthority> {
        self.config.validate()?;
        let provider = self
            .provider
            .ok_or_else(|| CoreError::invalid_config("an identity provider is required"))?;

        let storage = self
            .storage
            .unwrap_or_else(|| Rc::new(MemoryStorage::new()));
        let store = CredentialStore::new(
            storage,
            self.config.token_key.clone(),
            self.config.user_info_key.clone(),
        );

        let authority = SessionAuthority {
            inner: Rc::new(Inner {
                store,
                provider,
                navigator: self.navigator.unwrap_or_else(|| Rc::new(NoopNavigator)),
                clock: self.clock.unwrap_or_else(|| Rc::new(SystemClock)),
                config: self.config,
                generation: Cell::new(0),
                renewal_seq: Cell::new(0),
                pending_renewal: RefCell::new(None),
            }),
        };
        authority.hydrate();
        Ok(authority)
    }
}

impl SessionAuthority {
    pub fn builder(config: SessionConfig) -> SessionAuthorityBuilder {
        SessionAuthorityBuilder {
            config,
            storage: None,
            provider: None,
            navigator: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Read-only view of the credential store
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    fn inspector(&self) -> ClaimInspector<'_> {
        ClaimInspector::new(&self.inner.store, self.inner.clock.as_ref())
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Reconcile persisted state at startup.
    ///
    /// An undecodable credential is dropped. A decodable one gets its claim
    /// snapshot rewritten if the cached copy is missing or stale. Expired
    /// credentials are kept so a renewal can still be attempted.
    pub fn hydrate(&self) {
        let Some(token) = self.inner.store.get() else {
            debug!("No persisted credential");
            return;
        };

        match claims::decode(&token) {
            Ok(decoded) => {
                if self.inner.store.cached_claims() != Some(ClaimSnapshot::from(&decoded)) {
                    debug!("Rebuilding claim snapshot from persisted credential");
                    self.inner.store.put(&token);
                }
                info!(
                    expired = decoded.is_expired(self.now()),
                    "Session hydrated from persisted credential"
                );
            }
            Err(e) => {
                warn!(error = %e, "Discarding undecodable persisted credential");
                self.discard_credential();
            }
        }
    }

    /// Clear session state without navigating anywhere
    pub fn teardown(&self) {
        self.discard_credential();
        self.inner.pending_renewal.borrow_mut().take();
        debug!("Session torn down");
    }

    fn discard_credential(&self) {
        self.inner.store.clear();
        self.bump_generation();
    }

    fn bump_generation(&self) {
        self.inner.generation.set(self.inner.generation.get() + 1);
    }

    fn store_credential(&self, token: &str) -> AuthResult<Session> {
        let decoded = claims::decode(token).map_err(|e| {
            AuthError::InvalidResponse(format!("issued credential cannot be decoded: {e}"))
        })?;
        let expires_at = decoded.expiration_date().ok_or_else(|| {
            AuthError::InvalidResponse("issued credential expiry is out of range".to_string())
        })?;

        self.inner.store.put(token);
        self.bump_generation();

        Ok(Session {
            user: user_from_claims(&decoded),
            expires_at,
        })
    }

    // ---- queries -------------------------------------------------------

    /// Raw credential for attaching to outgoing requests
    pub fn credential(&self) -> Option<String> {
        self.inner.store.get()
    }

    pub fn current_claims(&self) -> Option<Claims> {
        self.inspector().current_claims()
    }

    /// True iff a credential is present and its expiry is in the future.
    ///
    /// An undecodable credential ends the session.
    pub fn is_authenticated(&self) -> bool {
        let checked = self.inspector().try_current_claims();
        match checked {
            Ok(Some(claims)) => !claims.is_expired(self.now()),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Stored credential is undecodable, ending session");
                self.discard_credential();
                false
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.current_role() == Some(Role::Administrador)
    }

    pub fn is_client(&self) -> bool {
        self.is_authenticated() && self.current_role() == Some(Role::Cliente)
    }

    /// Cached snapshot first, decoded credential second
    fn lookup(
        &self,
        cached: impl Fn(ClaimSnapshot) -> Option<String>,
        decoded: impl Fn(Claims) -> Option<String>,
    ) -> Option<String> {
        self.inner.store.get()?;
        self.inner
            .store
            .cached_claims()
            .and_then(cached)
            .filter(|value| !value.is_empty())
            .or_else(|| self.current_claims().and_then(decoded))
            .filter(|value| !value.is_empty())
    }

    pub fn current_role(&self) -> Option<Role> {
        self.lookup(|s| s.role, |c| c.role_name)
            .as_deref()
            .and_then(Role::parse)
    }

    pub fn user_id(&self) -> Option<String> {
        self.lookup(|s| s.id, |c| c.subject)
    }

    pub fn username(&self) -> Option<String> {
        self.lookup(|s| s.username, |c| c.username)
    }

    pub fn display_name(&self) -> Option<String> {
        self.lookup(|s| s.nombre, |c| c.display_name)
    }

    pub fn email(&self) -> Option<String> {
        self.lookup(|s| s.email, |c| c.email)
    }

    /// Composite user view, absent without a readable credential
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.inner.store.get()?;
        if self.inner.store.cached_claims().is_none() && self.current_claims().is_none() {
            return None;
        }
        Some(CurrentUser {
            id: self.user_id(),
            display_name: self.display_name(),
            username: self.username(),
            email: self.email(),
            role: self.current_role(),
        })
    }

    pub fn current_user_info(&self) -> Option<UserInfo> {
        let user = self.current_user()?;
        Some(UserInfo {
            user,
            token_valid: self.is_authenticated(),
            seconds_remaining: self.seconds_remaining(),
        })
    }

    /// See [`claims::expiring_soon`]; true without a credential
    pub fn expiring_soon(&self, threshold_minutes: i64) -> bool {
        self.inspector().expiring_soon(threshold_minutes)
    }

    pub fn seconds_remaining(&self) -> i64 {
        self.inspector().seconds_remaining()
    }

    pub fn will_expire_within(&self, minutes: i64) -> bool {
        self.inspector().will_expire_within(minutes)
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.current_claims()?.expiration_date()
    }

    pub fn issued_date(&self) -> Option<DateTime<Utc>> {
        self.current_claims()?.issued_date()
    }

    // ---- commands ------------------------------------------------------

    /// Exchange a username and password for a credential.
    ///
    /// Any transport or HTTP failure clears a stale credential before the
    /// error is returned.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> AuthResult<Session> {
        let request = LoginRequest {
            username: username.into(),
            password: password.into(),
        };
        debug!(username = %request.username, "Signing in");

        match self.inner.provider.login(&request).await {
            Ok(response) => match response.credential() {
                Some(token) => {
                    let session = self.store_credential(token)?;
                    info!(username = %request.username, role = ?session.user.role, "Signed in");
                    Ok(session)
                }
                None => {
                    warn!("Login response carried no credential");
                    Err(AuthError::InvalidResponse(
                        response
                            .message
                            .unwrap_or_else(|| "login response carried no token".to_string()),
                    ))
                }
            },
            Err(e) => {
                warn!(error = %e, "Sign-in failed, clearing any stale credential");
                self.discard_credential();
                Err(e)
            }
        }
    }

    /// Create a client account, signing in when the provider issues a
    /// credential and auto-login is enabled
    pub async fn register(&self, fields: RegistrationFields) -> AuthResult<RegistrationOutcome> {
        let request = RegisterRequest::from(fields);
        debug!(username = %request.fields.username, "Registering account");

        let response = self.inner.provider.register(&request).await?;
        match response.credential() {
            Some(token) if self.inner.config.auto_login_on_register => {
                let session = self.store_credential(token)?;
                info!(username = %request.fields.username, "Registered and signed in");
                Ok(RegistrationOutcome::SignedIn(session))
            }
            Some(_) => {
                debug!("Ignoring credential in registration response, auto-login disabled");
                Ok(RegistrationOutcome::Registered {
                    message: response.message,
                })
            }
            None => {
                info!(username = %request.fields.username, "Registered, sign-in required");
                Ok(RegistrationOutcome::Registered {
                    message: response.message,
                })
            }
        }
    }

    /// Renew the current credential.
    ///
    /// At most one renewal is in flight: concurrent callers await the same
    /// attempt and observe the same outcome. Any failure ends the session.
    pub async fn refresh(&self) -> AuthResult<Session> {
        let pending = {
            let mut slot = self.inner.pending_renewal.borrow_mut();
            match slot.as_ref() {
                Some((_, pending)) => {
                    debug!("Joining renewal already in flight");
                    pending.clone()
                }
                None => {
                    let id = self.inner.renewal_seq.get() + 1;
                    self.inner.renewal_seq.set(id);
                    let pending = self.clone().renew(id).boxed_local().shared();
                    *slot = Some((id, pending.clone()));
                    pending
                }
            }
        };
        pending.await
    }

    async fn renew(self, id: u64) -> AuthResult<Session> {
        let generation = self.inner.generation.get();
        let outcome = self.request_renewal().await;

        {
            let mut slot = self.inner.pending_renewal.borrow_mut();
            if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
                slot.take();
            }
        }

        if self.inner.generation.get() != generation {
            info!("Discarding renewal that finished after the session changed");
            return Err(AuthError::SessionExpired);
        }

        match outcome.and_then(|token| self.store_credential(&token)) {
            Ok(session) => {
                info!(expires_at = %session.expires_at, "Credential renewed");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Credential renewal failed, ending session");
                self.logout();
                Err(e)
            }
        }
    }

    async fn request_renewal(&self) -> AuthResult<String> {
        let token = self.inner.store.get().ok_or(AuthError::NoCredential)?;
        let response = self.inner.provider.refresh(&RefreshRequest { token }).await?;
        response.credential().map(str::to_string).ok_or_else(|| {
            AuthError::InvalidResponse(
                response
                    .message
                    .unwrap_or_else(|| "refresh response carried no token".to_string()),
            )
        })
    }

    /// End the session and send the user to the login page.
    ///
    /// Safe to call without a session; the redirect still happens.
    pub fn logout(&self) {
        let had_credential = self.inner.store.get().is_some();
        self.discard_credential();
        self.inner.pending_renewal.borrow_mut().take();
        info!(had_credential, "Signed out");
        self.inner.navigator.navigate(&self.inner.config.routes.login);
    }
}

impl SessionState for SessionAuthority {
    fn is_authenticated(&self) -> bool {
        SessionAuthority::is_authenticated(self)
    }

    fn is_admin(&self) -> bool {
        SessionAuthority::is_admin(self)
    }

    fn is_client(&self) -> bool {
        SessionAuthority::is_client(self)
    }

    fn expiring_soon(&self, threshold_minutes: i64) -> bool {
        SessionAuthority::expiring_soon(self, threshold_minutes)
    }
}

fn user_from_claims(claims: &Claims) -> CurrentUser {
    CurrentUser {
        id: claims.subject.clone(),
        display_name: claims.display_name.clone(),
        username: claims.username.clone(),
        email: claims.email.clone(),
        role: claims.role(),
    }
}
