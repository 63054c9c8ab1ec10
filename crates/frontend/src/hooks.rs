//! Hooks for reading the session

use crate::context::SessionContext;
use tienda_core::{CurrentUser, Role, UserInfo};
use yew::prelude::*;

/// The session context, if a [`crate::SessionProvider`] is mounted above
#[hook]
pub fn use_session() -> Option<SessionContext> {
    use_context::<SessionContext>()
}

#[hook]
pub fn use_is_authenticated() -> bool {
    use_session().is_some_and(|session| session.authority().is_authenticated())
}

#[hook]
pub fn use_current_user() -> Option<CurrentUser> {
    use_session().and_then(|session| session.authority().current_user())
}

#[hook]
pub fn use_user_info() -> Option<UserInfo> {
    use_session().and_then(|session| session.authority().current_user_info())
}

/// Role of the signed-in user
#[hook]
pub fn use_role() -> Option<Role> {
    use_session().and_then(|session| session.authority().current_role())
}
