//! Route guard for protected pages.

use roster_core::user::UserRecord;

use crate::session::AuthState;

/// What a protected page should do for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The bootstrap has not decided yet; render a spinner.
    Pending,
    /// Render the page.
    Allow,
    /// Authenticated, but the page needs a capability the user lacks.
    Forbidden,
    /// Not signed in; go to the login entry point.
    RedirectToLogin(String),
}

/// Decide access for a page that only requires a signed-in user.
pub fn decide(state: &AuthState, login_path: &str) -> RouteDecision {
    decide_with(state, login_path, |_| true)
}

/// Decide access for a page gated by `allowed`, typically one of the
/// predicates in [`roster_core::roles`].
pub fn decide_with<F>(state: &AuthState, login_path: &str, allowed: F) -> RouteDecision
where
    F: Fn(Option<&UserRecord>) -> bool,
{
    match state {
        AuthState::Uninitialized | AuthState::Resolving => RouteDecision::Pending,
        AuthState::Unauthenticated => RouteDecision::RedirectToLogin(login_path.to_string()),
        AuthState::Authenticated(user) => {
            if allowed(Some(user)) {
                RouteDecision::Allow
            } else {
                RouteDecision::Forbidden
            }
        }
    }
}
