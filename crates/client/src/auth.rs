//! Authorization facade: the only surface the rest of the front-end uses
//! for identity and role decisions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roster_core::error::CoreError;
use roster_core::roles::{self, Capabilities, Role};
use roster_core::types::DbId;
use roster_core::user::{PasswordChange, ProfileUpdate, UserRecord};
use roster_core::validation;
use tokio::sync::watch;

use crate::api::{AuthPayload, RosterApi};
use crate::bootstrap::{Bootstrap, Bootstrapper};
use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::gateway::Gateway;
use crate::guard::{self, RouteDecision};
use crate::navigation::Navigator;
use crate::oauth::OAuthCallback;
use crate::session::{AuthState, Session};
use crate::store::{CredentialKey, CredentialStore};

/// Owns the in-memory user for the lifetime of the session and exposes
/// login/logout plus pure capability checks.
pub struct AuthContext {
    session: Arc<Session>,
    api: RosterApi,
    login_path: String,
    initialized: AtomicBool,
}

impl AuthContext {
    /// Wire a context from its parts.
    pub fn new(session: Arc<Session>, api: RosterApi, login_path: impl Into<String>) -> Self {
        Self {
            session,
            api,
            login_path: login_path.into(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Build session, gateway, and API client from configuration.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, reqwest::Error> {
        let session = Session::new(store);
        let gateway = Gateway::new(config, session.clone(), navigator)?;
        let api = RosterApi::new(Arc::new(gateway));
        Ok(Self::new(session, api, config.login_path.clone()))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &RosterApi {
        &self.api
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    // ---- lifecycle ----

    /// Run the session bootstrap. Allowed once per context.
    pub async fn initialize(&self) -> Result<Bootstrap, AuthError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(AuthError::AlreadyInitialized);
        }
        Ok(Bootstrapper::new(self.session.clone(), self.api.clone())
            .run()
            .await)
    }

    /// Stop background work; later state updates become no-ops.
    pub fn teardown(&self) {
        self.session.teardown();
    }

    // ---- state ----

    pub fn current_user(&self) -> Option<UserRecord> {
        self.session.current_user()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn state(&self) -> AuthState {
        self.session.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.session.subscribe()
    }

    // ---- operations ----

    /// Log in with email and password.
    ///
    /// On success the token and user are stored and the session is
    /// authenticated before this returns. A failed attempt leaves any
    /// existing session untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        validation::validate_login(email, password)?;
        let payload = self.api.login(email.trim(), password).await?;
        self.session.establish(&payload.token, payload.user.clone())?;
        Ok(payload)
    }

    /// Create an account and sign in with it.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<AuthPayload, AuthError> {
        validation::validate_registration(email, password, first_name, last_name)?;
        let payload = self
            .api
            .register(email.trim(), password, first_name.trim(), last_name.trim())
            .await?;
        self.session.establish(&payload.token, payload.user.clone())?;
        Ok(payload)
    }

    /// Finish an OAuth login from the callback query.
    ///
    /// The token is written first so `/auth/me` can authenticate with it;
    /// any failure afterwards clears it again.
    pub async fn complete_oauth(&self, callback: OAuthCallback) -> Result<UserRecord, AuthError> {
        let token = match callback {
            OAuthCallback::Token(token) => token,
            OAuthCallback::Failed(reason) => return Err(AuthError::OAuth(reason)),
            OAuthCallback::Missing => return Err(AuthError::OAuth("no token received".into())),
        };

        self.session.store().set(CredentialKey::Token, &token)?;
        let user = match self.api.me().await {
            Ok(user) => user,
            Err(e) => {
                self.session.invalidate();
                return Err(e.into());
            }
        };

        if let Err(e) = self.session.establish(&token, user.clone()) {
            self.session.invalidate();
            return Err(e.into());
        }
        Ok(user)
    }

    /// Sign out locally. The backend is not contacted.
    pub fn logout(&self) {
        tracing::info!("Logging out");
        self.session.invalidate();
    }

    /// Re-fetch the current user. Any failure logs the user out and is
    /// returned.
    ///
    /// Requires an authenticated session. A logout or a new login while the
    /// call is in flight is left alone.
    pub async fn refresh(&self) -> Result<UserRecord, AuthError> {
        let epoch = self.session.epoch();
        let user = match self.api.me().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Refresh failed, logging out");
                self.session.invalidate_if(epoch);
                return Err(e.into());
            }
        };

        match self.session.replace_user_if(epoch, user.clone()) {
            Ok(true) => Ok(user),
            Ok(false) => {
                tracing::warn!("Refresh without an active session, logging out");
                self.session.invalidate_if(epoch);
                Err(CoreError::Unauthorized("no active session".into()).into())
            }
            Err(e) => {
                self.session.invalidate_if(epoch);
                Err(e.into())
            }
        }
    }

    /// Save profile fields and mirror them into the session.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserRecord, AuthError> {
        validation::validate_email(&update.email)?;
        validation::require_non_empty("firstName", &update.first_name)?;
        validation::require_non_empty("lastName", &update.last_name)?;

        let mut user = self
            .current_user()
            .ok_or_else(|| CoreError::Unauthorized("no active session".into()))?;
        let epoch = self.session.epoch();

        let saved = self.api.update_profile(update).await?;
        user.merge_profile(&saved);
        if !self.session.replace_user_if(epoch, user.clone())? {
            let ended = CoreError::Unauthorized("session ended during profile update".into());
            return Err(ended.into());
        }
        Ok(user)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), AuthError> {
        validation::require_non_empty("currentPassword", &change.current_password)?;
        validation::validate_new_password(&change.new_password)?;
        self.api.change_password(change).await?;
        Ok(())
    }

    /// Delete the account, then drop token and user together.
    pub async fn delete_account(&self) -> Result<(), AuthError> {
        self.api.delete_profile().await?;
        tracing::info!("Account deleted");
        self.session.invalidate();
        Ok(())
    }

    // ---- capabilities ----

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles::has_role(self.current_user().as_ref(), roles)
    }

    pub fn is_admin(&self) -> bool {
        roles::is_admin(self.current_user().as_ref())
    }

    pub fn can_manage_all(&self) -> bool {
        roles::can_manage_all(self.current_user().as_ref())
    }

    pub fn can_edit_group(&self, created_by: DbId) -> bool {
        roles::can_edit_group(self.current_user().as_ref(), created_by)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(self.current_user().as_ref())
    }

    // ---- routing ----

    /// Decision for a page that needs any signed-in user.
    pub fn guard(&self) -> RouteDecision {
        guard::decide(&self.session.state(), &self.login_path)
    }

    /// Decision for a page gated by a capability predicate.
    pub fn guard_with<F>(&self, allowed: F) -> RouteDecision
    where
        F: Fn(Option<&UserRecord>) -> bool,
    {
        guard::decide_with(&self.session.state(), &self.login_path, allowed)
    }
}
