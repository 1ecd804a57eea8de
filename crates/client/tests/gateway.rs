//! Integration tests for the HTTP gateway: bearer injection, reaction to
//! authorization failures, and error propagation.

mod common;

use assert_matches::assert_matches;
use common::{ana, client, spawn_backend, store_is_empty, stored_session, unreachable_base_url};
use roster_client::error::{ApiError, AuthError};
use roster_client::navigation::Navigator;
use roster_client::session::AuthState;
use roster_client::store::{CredentialStore, MemoryCredentialStore};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Token injection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stored_token_is_sent_as_bearer() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, stored_session("tok1", &ana()), "/dashboard");

    let answer: Value = h.auth.api().gateway().get_json("/echo", "echo failed").await.unwrap();

    assert_eq!(answer["authorization"], "Bearer tok1");
}

#[tokio::test]
async fn no_authorization_header_without_token() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, MemoryCredentialStore::new(), "/login");

    let answer: Value = h.auth.api().gateway().get_json("/echo", "echo failed").await.unwrap();

    assert!(answer["authorization"].is_null());
}

#[tokio::test]
async fn header_follows_the_store_between_calls() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, MemoryCredentialStore::new(), "/login");

    h.auth.api().public_units().await.unwrap();
    h.auth.login("a@b.com", "secret").await.unwrap();
    h.auth.api().public_units().await.unwrap();
    h.auth.logout();
    h.auth.api().public_units().await.unwrap();

    let seen: Vec<Option<String>> = backend
        .requests_to("/units/public")
        .into_iter()
        .map(|r| r.authorization)
        .collect();
    assert_eq!(seen, vec![None, Some("Bearer tok1".to_string()), None]);
}

// ---------------------------------------------------------------------------
// Authorization failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_call_clears_session_and_redirects() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, stored_session("tok1", &ana()), "/dashboard");
    h.auth.initialize().await.unwrap();
    assert!(h.auth.is_authenticated());

    let result: Result<Value, _> = h.auth.api().gateway().get_json("/groups", "failed").await;

    assert_matches!(result, Err(ApiError::Unauthorized { message }) if message == "Token expired");
    assert!(store_is_empty(h.store.as_ref()));
    assert_eq!(h.auth.current_user(), None);
    assert_eq!(h.auth.state(), AuthState::Unauthenticated);
    assert_eq!(h.navigator.current_location(), "/login");
    h.auth.teardown();
}

#[tokio::test]
async fn concurrent_unauthorized_responses_are_idempotent() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, stored_session("tok1", &ana()), "/dashboard");
    let gateway = h.auth.api().gateway();

    let (a, b) = tokio::join!(
        gateway.get_json::<Value>("/groups", "failed"),
        gateway.get_json::<Value>("/groups", "failed"),
    );

    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert!(store_is_empty(h.store.as_ref()));
    assert_eq!(h.navigator.current_location(), "/login");
}

#[tokio::test]
async fn no_redirect_when_already_on_login_page() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, stored_session("tok1", &ana()), "/login");

    let result = h.auth.api().gateway().get_json::<Value>("/groups", "failed").await;

    assert!(result.unwrap_err().is_unauthorized());
    assert!(store_is_empty(h.store.as_ref()));
    assert!(h.navigator.history().is_empty());
}

#[tokio::test]
async fn failed_login_keeps_existing_session() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, stored_session("tok1", &ana()), "/dashboard");
    h.auth.initialize().await.unwrap();

    let result = h.auth.login("a@b.com", "wrong-password").await;

    assert_matches!(
        result,
        Err(AuthError::Api(ApiError::Unauthorized { message })) if message == "Bad credentials"
    );
    assert_eq!(h.store.token().as_deref(), Some("tok1"));
    assert_eq!(h.store.cached_user(), Some(ana()));
    assert_eq!(h.auth.current_user(), Some(ana()));
    assert!(h.navigator.history().is_empty());
    h.auth.teardown();
}

#[tokio::test]
async fn failed_registration_propagates_backend_message() {
    let backend = spawn_backend().await;
    let h = client(&backend.base_url, MemoryCredentialStore::new(), "/login");

    let result = h.auth.register("taken@b.com", "secret", "Tim", "T").await;

    assert_matches!(
        result,
        Err(AuthError::Api(ApiError::Rejected { status: 409, message }))
            if message == "E-Mail already registered"
    );
    assert!(store_is_empty(h.store.as_ref()));
    assert!(h.navigator.history().is_empty());
}

// ---------------------------------------------------------------------------
// Other failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_error_without_body_uses_fallback_message() {
    let backend = spawn_backend().await;
    backend.set_me(common::Mode::ServerError);
    let h = client(&backend.base_url, stored_session("tok1", &ana()), "/dashboard");

    let result = h.auth.api().me().await;

    assert_matches!(
        result,
        Err(ApiError::Rejected { status: 500, message }) if message == "Failed to fetch user data"
    );
    assert_eq!(h.store.token().as_deref(), Some("tok1"));
}

#[tokio::test]
async fn unreachable_backend_is_not_an_authorization_failure() {
    let base_url = unreachable_base_url().await;
    let h = client(&base_url, stored_session("tok1", &ana()), "/dashboard");

    let result = h.auth.api().me().await;

    assert_matches!(result, Err(e) if e.is_connectivity());
    assert_eq!(h.store.token().as_deref(), Some("tok1"));
    assert!(h.navigator.history().is_empty());
}
