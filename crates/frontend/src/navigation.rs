//! Navigators for the browser

use tienda_core::Navigator;
use tracing::{debug, warn};
use yew::Callback;

/// Moves the whole page to a route through `window.location`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, route: &str) {
        let Some(window) = web_sys::window() else {
            warn!(route, "No window to navigate with");
            return;
        };
        let location = window.location();
        if location.pathname().ok().as_deref() == Some(route) {
            debug!(route, "Already on route");
            return;
        }
        if let Err(e) = location.assign(route) {
            warn!(route, error = ?e, "Navigation failed");
        }
    }
}

/// Hands routes to the application's own router
#[derive(Clone)]
pub struct CallbackNavigator {
    callback: Callback<String>,
}

impl CallbackNavigator {
    pub fn new(callback: Callback<String>) -> Self {
        Self { callback }
    }
}

impl Navigator for CallbackNavigator {
    fn navigate(&self, route: &str) {
        self.callback.emit(route.to_string());
    }
}
