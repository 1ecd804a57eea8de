//! Explicitly constructed session component.
//!
//! [`Session`] owns the credential store handle and the in-memory
//! authentication state. It is created once per application run, shared
//! by `Arc` with the gateway and the facade, and ended with
//! [`Session::teardown`]. State changes are published on a
//! [`tokio::sync::watch`] channel so front-ends can re-render.

use std::sync::{Arc, Mutex, MutexGuard};

use roster_core::user::UserRecord;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::{CredentialKey, CredentialStore};

/// Authentication state of the running application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// The bootstrap has not started.
    #[default]
    Uninitialized,
    /// The bootstrap is deciding; nothing may be rendered as authenticated.
    Resolving,
    /// A user is signed in.
    Authenticated(UserRecord),
    /// No user is signed in.
    Unauthenticated,
}

impl AuthState {
    /// `true` until the bootstrap reaches a decision.
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Uninitialized | AuthState::Resolving)
    }

    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Session token + user record, durable and in memory.
///
/// Every write goes through one lock that covers the store writes and the
/// state change together, so a concurrent invalidation can never leave one
/// credential key without the other.
///
/// The session epoch counts identity changes: [`establish`](Self::establish)
/// and [`invalidate`](Self::invalidate) bump it. Background work records the
/// epoch it started under and uses the `*_if` variants, which do nothing
/// once the epoch has moved on.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<AuthState>,
    /// Current epoch; held while writing.
    epoch: Mutex<u64>,
    /// Cancelled on teardown; background work must stop updating state.
    cancel: CancellationToken,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Arc<Self> {
        let (state, _) = watch::channel(AuthState::Uninitialized);
        Arc::new(Self {
            store,
            state,
            epoch: Mutex::new(0),
            cancel: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Current token straight from the durable store.
    pub fn token(&self) -> Option<String> {
        self.store.token()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.state.borrow().user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Identity generation; changes on every establish and invalidate.
    pub fn epoch(&self) -> u64 {
        *self.lock()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Token for background work tied to this session's lifetime.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to a new state unless the session was torn down.
    pub(crate) fn transition(&self, next: AuthState) {
        let _guard = self.lock();
        self.publish(next);
    }

    /// Publish `next`; callers hold the lock.
    fn publish(&self, next: AuthState) {
        if self.is_torn_down() {
            tracing::debug!("Ignoring state change after teardown");
            return;
        }
        self.state.send_replace(next);
    }

    /// Persist token and user, then mark the session authenticated.
    ///
    /// If the user write fails the token write is rolled back, so callers
    /// never observe one key without the other.
    pub fn establish(&self, token: &str, user: UserRecord) -> Result<(), StoreError> {
        let mut epoch = self.lock();

        self.store.set(CredentialKey::Token, token)?;
        if let Err(e) = self.store.save_user(&user) {
            if let Err(rollback) = self.store.clear(CredentialKey::Token) {
                tracing::error!(error = %rollback, "Failed to roll back token write");
            }
            return Err(e);
        }

        *epoch += 1;
        tracing::info!(user_id = user.id, role = %user.role, epoch = *epoch, "Session established");
        self.publish(AuthState::Authenticated(user));
        Ok(())
    }

    /// Replace the signed-in user's record in both copies.
    ///
    /// Only applies while authenticated; returns `Ok(false)` otherwise so a
    /// late refresh cannot resurrect a session that was logged out.
    pub fn replace_user(&self, user: UserRecord) -> Result<bool, StoreError> {
        let epoch = self.lock();
        self.replace_locked(&epoch, *epoch, user)
    }

    /// [`replace_user`](Self::replace_user) for work started under `expected`.
    /// Returns `Ok(false)` when the session has changed since.
    pub fn replace_user_if(&self, expected: u64, user: UserRecord) -> Result<bool, StoreError> {
        let epoch = self.lock();
        self.replace_locked(&epoch, expected, user)
    }

    fn replace_locked(
        &self,
        epoch: &MutexGuard<'_, u64>,
        expected: u64,
        user: UserRecord,
    ) -> Result<bool, StoreError> {
        if **epoch != expected || self.is_torn_down() || self.state.borrow().user().is_none() {
            return Ok(false);
        }
        self.store.save_user(&user)?;
        self.publish(AuthState::Authenticated(user));
        Ok(true)
    }

    /// Clear token and user together and mark the session unauthenticated.
    ///
    /// Idempotent: invalidating an already-empty session is a no-op. Store
    /// failures are logged, the in-memory state is cleared regardless.
    pub fn invalidate(&self) {
        let mut epoch = self.lock();
        self.invalidate_locked(&mut epoch);
    }

    /// [`invalidate`](Self::invalidate) for work started under `expected`.
    /// Returns `false`, leaving everything untouched, when the session has
    /// changed since.
    pub fn invalidate_if(&self, expected: u64) -> bool {
        let mut epoch = self.lock();
        if *epoch != expected {
            tracing::debug!(expected, current = *epoch, "Skipping invalidation of a newer session");
            return false;
        }
        self.invalidate_locked(&mut epoch);
        true
    }

    fn invalidate_locked(&self, epoch: &mut MutexGuard<'_, u64>) {
        if let Err(e) = self.store.clear_all() {
            tracing::error!(error = %e, "Failed to clear credential store");
        }
        if self.state.borrow().user().is_some() {
            tracing::info!("Session invalidated");
        }
        **epoch += 1;
        self.publish(AuthState::Unauthenticated);
    }

    /// End the session's lifetime. Background tasks stop and later state
    /// updates are ignored. Durable credentials are kept.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use roster_core::roles::Role;

    use super::*;
    use crate::store::MemoryCredentialStore;

    fn user() -> UserRecord {
        UserRecord {
            id: 1,
            email: "a@b.com".into(),
            first_name: "Ana".into(),
            last_name: "B".into(),
            role: Role::Admin,
            unit: None,
        }
    }

    fn session() -> (Arc<MemoryCredentialStore>, Arc<Session>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let session = Session::new(store.clone());
        (store, session)
    }

    #[test]
    fn starts_uninitialized_and_loading() {
        let (_, session) = session();
        assert_eq!(session.state(), AuthState::Uninitialized);
        assert!(session.is_loading());
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn establish_writes_both_copies() {
        let (store, session) = session();
        session.establish("tok1", user()).unwrap();

        assert_eq!(store.token().as_deref(), Some("tok1"));
        assert_eq!(store.cached_user(), Some(user()));
        assert_eq!(session.current_user(), Some(user()));
        assert!(!session.is_loading());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let (store, session) = session();
        session.establish("tok1", user()).unwrap();

        session.invalidate();
        session.invalidate();

        assert_eq!(store.token(), None);
        assert_eq!(store.get(CredentialKey::User), None);
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn replace_user_requires_authenticated_session() {
        let (store, session) = session();
        assert!(!session.replace_user(user()).unwrap());
        assert_eq!(store.cached_user(), None);

        session.establish("tok1", user()).unwrap();
        let mut renamed = user();
        renamed.first_name = "Anna".into();
        assert!(session.replace_user(renamed.clone()).unwrap());
        assert_eq!(store.cached_user(), Some(renamed.clone()));
        assert_eq!(session.current_user(), Some(renamed));
    }

    #[test]
    fn teardown_freezes_state() {
        let (store, session) = session();
        session.establish("tok1", user()).unwrap();
        session.teardown();

        session.invalidate();
        assert_eq!(session.current_user(), Some(user()));
        // The durable copy is still cleared: invalidation is about the token.
        assert_eq!(store.token(), None);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let (_, session) = session();
        let mut rx = session.subscribe();

        session.establish("tok1", user()).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().user(), Some(&user()));

        session.invalidate();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AuthState::Unauthenticated);
    }

    #[test]
    fn epoch_moves_on_establish_and_invalidate() {
        let (_, session) = session();
        let start = session.epoch();

        session.establish("tok1", user()).unwrap();
        assert_eq!(session.epoch(), start + 1);

        session.invalidate();
        assert_eq!(session.epoch(), start + 2);
    }

    #[test]
    fn stale_invalidation_is_ignored() {
        let (store, session) = session();
        let stale = session.epoch();
        session.establish("tok2", user()).unwrap();

        assert!(!session.invalidate_if(stale));

        assert_eq!(store.token().as_deref(), Some("tok2"));
        assert_eq!(session.current_user(), Some(user()));
    }

    #[test]
    fn stale_replacement_is_ignored() {
        let (store, session) = session();
        session.establish("tok1", user()).unwrap();
        let stale = session.epoch();
        session.invalidate();
        session.establish("tok2", user()).unwrap();

        let mut other = user();
        other.first_name = "Old".into();
        assert!(!session.replace_user_if(stale, other).unwrap());

        assert_eq!(store.cached_user(), Some(user()));
        assert_eq!(session.current_user(), Some(user()));
    }

    #[test]
    fn concurrent_replace_and_invalidate_keep_keys_paired() {
        for _ in 0..200 {
            let (store, session) = session();
            session.establish("tok1", user()).unwrap();

            let replacer = {
                let session = session.clone();
                std::thread::spawn(move || {
                    let mut renamed = user();
                    renamed.first_name = "Anna".into();
                    session.replace_user(renamed).unwrap();
                })
            };
            let invalidator = {
                let session = session.clone();
                std::thread::spawn(move || session.invalidate())
            };
            replacer.join().unwrap();
            invalidator.join().unwrap();

            assert_eq!(store.token(), None);
            assert_eq!(store.get(CredentialKey::User), None);
            assert_eq!(session.state(), AuthState::Unauthenticated);
        }
    }
}
