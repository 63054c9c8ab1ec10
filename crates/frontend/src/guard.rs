//! Route guard components

use crate::context::SessionContext;
use crate::hooks::use_session;
use tienda_core::{AccessDecision, AccessGuards};
use tracing::{debug, warn};
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct GuardProps {
    pub children: Children,
    /// Rendered while access is denied and the redirect is under way
    #[prop_or_default]
    pub fallback: Html,
}

#[derive(Clone, Copy, PartialEq)]
enum Gate {
    Authenticated,
    Admin,
}

fn evaluate(session: &SessionContext, gate: Gate) -> AccessDecision {
    let guards = AccessGuards::from_config(session.authority().config());
    match gate {
        Gate::Authenticated => guards.require_authenticated(session.authority()),
        Gate::Admin => guards.require_admin(session.authority()),
    }
}

/// Runs the redirect or the proactive renewal a decision calls for
#[hook]
fn use_guard(gate: Gate) -> Option<AccessDecision> {
    let session = use_session();
    let decision = session.as_ref().map(|session| evaluate(session, gate));

    use_effect_with(decision.clone(), move |decision| {
        match (session, decision) {
            (Some(session), Some(AccessDecision::Redirect(target))) => {
                session.navigate(target);
            }
            (Some(session), Some(AccessDecision::Allow { renewal_advised: true })) => {
                if session.authority().config().proactive_renewal {
                    debug!("Renewing credential ahead of expiry");
                    spawn_local(async move {
                        // Failure ends the session and navigates away
                        if let Err(e) = session.refresh().await {
                            debug!(error = %e, "Proactive renewal failed");
                        }
                    });
                }
            }
            (None, _) => warn!("Route guard rendered outside a SessionProvider"),
            _ => {}
        }
        || ()
    });

    decision
}

/// Renders its children only for an authenticated user
#[function_component(RequireAuth)]
pub fn require_auth(props: &GuardProps) -> Html {
    match use_guard(Gate::Authenticated) {
        Some(decision) if decision.is_allowed() => html! { <>{ props.children.clone() }</> },
        _ => props.fallback.clone(),
    }
}

/// Renders its children only for an administrator
#[function_component(RequireAdmin)]
pub fn require_admin(props: &GuardProps) -> Html {
    match use_guard(Gate::Admin) {
        Some(decision) if decision.is_allowed() => html! { <>{ props.children.clone() }</> },
        _ => props.fallback.clone(),
    }
}
