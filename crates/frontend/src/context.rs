//! Session context and provider

use crate::navigation::{BrowserNavigator, CallbackNavigator};
use crate::storage::origin_storage;
use gloo::timers::callback::Interval;
use std::rc::Rc;
use tienda_core::{
    AuthResult, CoreResult, Navigator, RegistrationFields, RegistrationOutcome, Session,
    SessionAuthority, SessionConfig,
};
use tienda_http::{ApiClient, SessionStack};
use tracing::{debug, error};
use yew::prelude::*;

/// How often mounted views re-check the session while one exists
pub const VALIDATION_INTERVAL_MS: u32 = 60_000;

/// Counter bumped whenever session state may have changed
#[derive(Debug, Default, PartialEq)]
struct Revision(u64);

impl Reducible for Revision {
    type Action = ();

    fn reduce(self: Rc<Self>, _action: Self::Action) -> Rc<Self> {
        Rc::new(Self(self.0.wrapping_add(1)))
    }
}

/// Forwards navigation and tells the provider to re-render
struct NotifyingNavigator {
    inner: Rc<dyn Navigator>,
    revision: UseReducerDispatcher<Revision>,
}

impl Navigator for NotifyingNavigator {
    fn navigate(&self, route: &str) {
        self.revision.dispatch(());
        self.inner.navigate(route);
    }
}

/// What components see of the session
#[derive(Clone)]
pub struct SessionContext {
    stack: SessionStack,
    navigator: Rc<dyn Navigator>,
    revision: u64,
    notify: Callback<()>,
}

impl PartialEq for SessionContext {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision
    }
}

impl SessionContext {
    pub fn authority(&self) -> &SessionAuthority {
        &self.stack.authority
    }

    /// Client for protected API calls
    pub fn api(&self) -> &ApiClient {
        &self.stack.api
    }

    pub fn navigate(&self, route: &str) {
        self.navigator.navigate(route);
    }

    /// Re-render session consumers
    pub fn notify(&self) {
        self.notify.emit(());
    }

    pub async fn login(&self, username: String, password: String) -> AuthResult<Session> {
        let result = self.stack.authority.login(username, password).await;
        self.notify();
        result
    }

    pub async fn register(&self, fields: RegistrationFields) -> AuthResult<RegistrationOutcome> {
        let result = self.stack.authority.register(fields).await;
        self.notify();
        result
    }

    pub async fn refresh(&self) -> AuthResult<Session> {
        let result = self.stack.authority.refresh().await;
        self.notify();
        result
    }

    pub fn logout(&self) {
        self.stack.authority.logout();
    }
}

/// Session provider props
#[derive(Properties, PartialEq)]
pub struct SessionProviderProps {
    #[prop_or_default]
    pub config: SessionConfig,
    /// Route through the application's router instead of reloading the page
    #[prop_or_default]
    pub on_navigate: Option<Callback<String>>,
    #[prop_or_default]
    pub children: Children,
}

fn build_stack(
    config: SessionConfig,
    on_navigate: Option<Callback<String>>,
    revision: UseReducerDispatcher<Revision>,
) -> CoreResult<(SessionStack, Rc<dyn Navigator>)> {
    let inner: Rc<dyn Navigator> = match on_navigate {
        Some(callback) => Rc::new(CallbackNavigator::new(callback)),
        None => Rc::new(BrowserNavigator),
    };
    let navigator: Rc<dyn Navigator> = Rc::new(NotifyingNavigator { inner, revision });
    let stack = SessionStack::new(config, origin_storage(), navigator.clone())?;
    Ok((stack, navigator))
}

/// Owns the session for everything below it.
///
/// The session is built once, on first render, from the `config` prop.
#[function_component(SessionProvider)]
pub fn session_provider(props: &SessionProviderProps) -> Html {
    let revision = use_reducer(Revision::default);

    let built = {
        let config = props.config.clone();
        let on_navigate = props.on_navigate.clone();
        let dispatcher = revision.dispatcher();
        use_memo((), move |_| build_stack(config, on_navigate, dispatcher))
    };

    // Re-check periodically so guards notice a credential running out
    {
        let built = built.clone();
        let dispatcher = revision.dispatcher();
        use_effect_with((), move |_| {
            let interval = Interval::new(VALIDATION_INTERVAL_MS, move || {
                if let Ok((stack, _)) = built.as_ref()
                    && stack.authority.credential().is_some()
                {
                    debug!(
                        seconds_remaining = stack.authority.seconds_remaining(),
                        "Revalidating session"
                    );
                    dispatcher.dispatch(());
                }
            });
            move || drop(interval)
        });
    }

    match built.as_ref() {
        Ok((stack, navigator)) => {
            let dispatcher = revision.dispatcher();
            let context = SessionContext {
                stack: stack.clone(),
                navigator: navigator.clone(),
                revision: revision.0,
                notify: Callback::from(move |_| dispatcher.dispatch(())),
            };
            html! {
                <ContextProvider<SessionContext> {context}>
                    {props.children.clone()}
                </ContextProvider<SessionContext>>
            }
        }
        Err(e) => {
            error!(error = %e, "Session layer could not start");
            html! {
                <div class="session-error">{"The application could not start. Please reload the page."}</div>
            }
        }
    }
}
