use crate::models::{Identity, Role};
use crate::routes::Route;
use crate::session::SessionState;

/// Outcome of gating a protected view.
///
/// Protected screens are built from the identity carried by `Render`, so
/// no protected state exists while the session is loading or when the
/// guard redirects.
#[derive(Debug, PartialEq, Eq)]
pub enum Guarded<'a> {
    /// Session not resolved yet: show a neutral placeholder, do not redirect.
    Placeholder,
    Redirect(Route),
    Render(&'a Identity),
}

pub fn guard(session: &SessionState, required_role: Option<Role>) -> Guarded<'_> {
    if session.loading {
        return Guarded::Placeholder;
    }

    let Some(identity) = session.identity.as_ref() else {
        return Guarded::Redirect(Route::Login);
    };

    match required_role {
        Some(role) if identity.role != role => Guarded::Redirect(Route::Unauthorized),
        _ => Guarded::Render(identity),
    }
}
