//! Navigation-time access guards
//!
//! Guards are pure functions of session state: they decide, the caller
//! performs the redirect.

use crate::config::{RouteConfig, SessionConfig};

/// Session queries the guards depend on
#[cfg_attr(test, mockall::automock)]
pub trait SessionState {
    fn is_authenticated(&self) -> bool;
    fn is_admin(&self) -> bool;
    fn is_client(&self) -> bool;
    fn expiring_soon(&self, threshold_minutes: i64) -> bool;
}

/// Outcome of a guard evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Entry allowed; `renewal_advised` signals that the credential is close
    /// to expiry and a background renewal would be worthwhile
    Allow { renewal_advised: bool },
    /// Entry denied; go to this route instead
    Redirect(String),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect(route) => Some(route),
            Self::Allow { .. } => None,
        }
    }
}

/// Authentication gate and admin role gate
#[derive(Debug, Clone)]
pub struct AccessGuards {
    routes: RouteConfig,
    renewal_threshold_minutes: i64,
}

impl AccessGuards {
    pub fn new(routes: RouteConfig, renewal_threshold_minutes: i64) -> Self {
        Self {
            routes,
            renewal_threshold_minutes,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.routes.clone(), config.guard_renewal_threshold_minutes)
    }

    /// Allow authenticated holders, send everyone else to login
    pub fn require_authenticated(&self, session: &impl SessionState) -> AccessDecision {
        if !session.is_authenticated() {
            tracing::info!(redirect = %self.routes.login, "Not authenticated, redirecting to login");
            return AccessDecision::Redirect(self.routes.login.clone());
        }

        let renewal_advised = session.expiring_soon(self.renewal_threshold_minutes);
        if renewal_advised {
            tracing::warn!(
                threshold_minutes = self.renewal_threshold_minutes,
                "Credential close to expiry, renewal advised"
            );
        }
        AccessDecision::Allow { renewal_advised }
    }

    /// Allow administrators. Authenticated holders without the role go to
    /// their own landing route, never back to login.
    pub fn require_admin(&self, session: &impl SessionState) -> AccessDecision {
        let decision = self.require_authenticated(session);
        if !decision.is_allowed() || session.is_admin() {
            return decision;
        }

        let target = if session.is_client() {
            &self.routes.client_home
        } else {
            &self.routes.root
        };
        tracing::info!(redirect = %target, "Administrator role required");
        AccessDecision::Redirect(target.clone())
    }
}
