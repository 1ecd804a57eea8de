//! One-time reconciliation of the credential store with the backend.
//!
//! Policy: optimistic cache, background refresh. When both a token and a
//! cached user are stored, the session is marked authenticated from the
//! cache at once and the backend is asked in a spawned task whether the
//! token still holds. The loading phase never waits on that task.
//!
//! | Stored            | Decision                                         |
//! |-------------------|--------------------------------------------------|
//! | nothing           | `Unauthenticated`                                |
//! | user, no token    | stale user cleared, `Unauthenticated`            |
//! | token, no user    | await `GET /auth/me`; failure clears everything  |
//! | token and user    | `Authenticated(cached)` + background refresh     |
//!
//! Background refresh outcomes:
//! - validation says invalid, or any call answers 401: session cleared.
//! - validation confirms: user re-fetched and stored.
//! - backend unreachable or answering 5xx: cached identity kept.
//! - any other failure of the validation call: session cleared.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::RosterApi;
use crate::session::{AuthState, Session};

/// What the background refresh ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Token confirmed, user record refreshed.
    Refreshed,
    /// Token confirmed, but the user could not be re-fetched; cache kept.
    Confirmed,
    /// Backend unreachable or failing; cached identity kept.
    Retained,
    /// Backend rejected the session; credentials cleared.
    Invalidated,
    /// The session was torn down, or replaced by a logout or new login,
    /// before the refresh finished.
    Cancelled,
}

/// Result of the synchronous part of the bootstrap.
#[derive(Debug)]
pub struct Bootstrap {
    /// State at the moment loading finished.
    pub state: AuthState,
    /// Background refresh, when one was started.
    pub refresh: Option<JoinHandle<RefreshOutcome>>,
}

/// Runs the session bootstrap against one session and backend.
pub struct Bootstrapper {
    session: Arc<Session>,
    api: RosterApi,
}

impl Bootstrapper {
    pub fn new(session: Arc<Session>, api: RosterApi) -> Self {
        Self { session, api }
    }

    /// Decide the initial authentication state.
    ///
    /// Returns as soon as the decision is made; the background refresh is
    /// handed back unawaited.
    pub async fn run(&self) -> Bootstrap {
        self.session.transition(AuthState::Resolving);

        let store = self.session.store();
        let token = store.token();
        let cached = store.cached_user();

        let refresh = match (token, cached) {
            (None, None) => {
                tracing::info!("No stored session");
                self.session.transition(AuthState::Unauthenticated);
                None
            }
            (None, Some(user)) => {
                tracing::warn!(user_id = user.id, "Cached user without token, clearing");
                self.session.invalidate();
                None
            }
            (Some(token), None) => {
                self.resolve_from_token(&token).await;
                None
            }
            (Some(_), Some(user)) => {
                tracing::info!(user_id = user.id, role = %user.role, "Restored session from cache");
                self.session.transition(AuthState::Authenticated(user));
                Some(self.spawn_refresh())
            }
        };

        Bootstrap {
            state: self.session.state(),
            refresh,
        }
    }

    /// Token without a usable cached user: there is nothing to render
    /// optimistically, so the user is fetched before loading ends.
    async fn resolve_from_token(&self, token: &str) {
        match self.api.me().await {
            Ok(user) => {
                if let Err(e) = self.session.establish(token, user) {
                    tracing::error!(error = %e, "Failed to persist resolved session");
                    self.session.invalidate();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored token could not be resolved to a user");
                self.session.invalidate();
            }
        }
    }

    fn spawn_refresh(&self) -> JoinHandle<RefreshOutcome> {
        let session = self.session.clone();
        let api = self.api.clone();
        let cancel = session.cancellation();
        let epoch = session.epoch();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => RefreshOutcome::Cancelled,
                outcome = reconcile(&session, &api, epoch) => {
                    tracing::debug!(?outcome, "Background session refresh finished");
                    outcome
                }
            }
        })
    }
}

/// Check the restored session with the backend. Every write is conditional
/// on `epoch`: a logout or a new login meanwhile turns the result into
/// [`RefreshOutcome::Cancelled`].
async fn reconcile(session: &Session, api: &RosterApi, epoch: u64) -> RefreshOutcome {
    match api.validate().await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Backend reports the stored session invalid");
            return invalidate(session, epoch);
        }
        Err(e) if e.is_unauthorized() => {
            // The gateway has already cleared the session.
            return RefreshOutcome::Invalidated;
        }
        Err(e) if e.is_connectivity() || e.is_server_error() => {
            tracing::warn!(error = %e, "Backend unavailable, keeping cached session");
            return RefreshOutcome::Retained;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session validation failed, clearing session");
            return invalidate(session, epoch);
        }
    }

    match api.me().await {
        Ok(user) => match session.replace_user_if(epoch, user) {
            Ok(true) => RefreshOutcome::Refreshed,
            Ok(false) => RefreshOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store refreshed user");
                RefreshOutcome::Confirmed
            }
        },
        Err(e) if e.is_unauthorized() => RefreshOutcome::Invalidated,
        Err(e) => {
            tracing::warn!(error = %e, "Could not refresh user record, keeping cache");
            RefreshOutcome::Confirmed
        }
    }
}

fn invalidate(session: &Session, epoch: u64) -> RefreshOutcome {
    if session.invalidate_if(epoch) {
        RefreshOutcome::Invalidated
    } else {
        RefreshOutcome::Cancelled
    }
}
