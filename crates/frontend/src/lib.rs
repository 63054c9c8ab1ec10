//! Browser bindings for the Tienda session layer
//!
//! `localStorage` persistence, page navigation, console logging, and the yew
//! provider, hooks and route guards built on the session authority.

pub mod context;
pub mod guard;
pub mod hooks;
pub mod logging;
pub mod navigation;
pub mod storage;

pub use context::{SessionContext, SessionProvider, SessionProviderProps};
pub use guard::{GuardProps, RequireAdmin, RequireAuth};
pub use hooks::{use_current_user, use_is_authenticated, use_role, use_session, use_user_info};
pub use logging::init_browser_logging;
pub use navigation::{BrowserNavigator, CallbackNavigator};
pub use storage::{BrowserStorage, origin_storage};
