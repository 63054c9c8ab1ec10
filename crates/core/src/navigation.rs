/// Moves the application to another route.
///
/// The browser implementation lives in the frontend crate; the session
/// authority only needs to be able to send the user to the login page.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator {
    fn navigate(&self, route: &str);
}

/// Navigator that ignores every request, for headless use
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: &str) {
        tracing::debug!(route, "Navigation requested without a navigator");
    }
}
