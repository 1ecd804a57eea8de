//! Shared test harness: an in-process mock of the roster backend plus a
//! fully wired client stack pointed at it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use roster_client::auth::AuthContext;
use roster_client::config::ClientConfig;
use roster_client::navigation::MemoryNavigator;
use roster_client::store::{CredentialStore, MemoryCredentialStore};
use roster_core::roles::Role;
use roster_core::user::UserRecord;
use serde_json::{json, Value};

/// How the mock answers an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal success answer.
    Ok,
    /// `false` from `/auth/validate`.
    Invalid,
    /// 401 with a message.
    Unauthorized,
    /// 500 with an empty body.
    ServerError,
    /// Never answers.
    Hang,
    /// `false` from `/auth/validate`, after [`SLOW_ANSWER`].
    SlowInvalid,
}

/// Delay used by [`Mode::SlowInvalid`].
pub const SLOW_ANSWER: std::time::Duration = std::time::Duration::from_millis(300);

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

pub struct MockState {
    pub token: String,
    pub user: Mutex<UserRecord>,
    pub validate: Mutex<Mode>,
    pub me: Mutex<Mode>,
    pub requests: Mutex<Vec<Recorded>>,
}

/// Handle to a running mock backend.
pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn set_validate(&self, mode: Mode) {
        *self.state.validate.lock().unwrap() = mode;
    }

    pub fn set_me(&self, mode: Mode) {
        *self.state.me.lock().unwrap() = mode;
    }

    pub fn set_user(&self, user: UserRecord) {
        *self.state.user.lock().unwrap() = user;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests whose path ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }
}

pub fn ana() -> UserRecord {
    UserRecord {
        id: 1,
        email: "a@b.com".to_string(),
        first_name: "Ana".to_string(),
        last_name: "B".to_string(),
        role: Role::Admin,
        unit: None,
    }
}

pub fn jugendwart() -> UserRecord {
    UserRecord {
        id: 2,
        email: "jw@b.com".to_string(),
        first_name: "Jan".to_string(),
        last_name: "W".to_string(),
        role: Role::Jugendwart,
        unit: None,
    }
}

/// Start the mock backend on an ephemeral port. The API lives under `/api`.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState {
        token: "tok1".to_string(),
        user: Mutex::new(ana()),
        validate: Mutex::new(Mode::Ok),
        me: Mutex::new(Mode::Ok),
        requests: Mutex::new(Vec::new()),
    });

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/validate", get(validate))
        .route("/units/public", get(public_units))
        .route("/groups", get(groups))
        .route("/echo", get(echo))
        .route(
            "/user/profile",
            get(profile).put(update_profile).delete(delete_profile),
        )
        .route("/user/profile/password", put(change_password));

    let app = Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}/api"),
        state,
    }
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

/// Client stack wired against one backend.
pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub auth: AuthContext,
}

/// Build an [`AuthContext`] against `base_url`, starting at `location`.
pub fn client(base_url: &str, store: MemoryCredentialStore, location: &str) -> Harness {
    let store = Arc::new(store);
    let navigator = Arc::new(MemoryNavigator::new(location));
    let config = ClientConfig::for_base_url(base_url);
    let auth = AuthContext::from_config(&config, store.clone(), navigator.clone())
        .expect("client should build");
    Harness {
        store,
        navigator,
        auth,
    }
}

/// Store pre-populated with `{token, user}`.
pub fn stored_session(token: &str, user: &UserRecord) -> MemoryCredentialStore {
    MemoryCredentialStore::with_session(token, user).expect("memory store never fails")
}

pub fn store_is_empty(store: &dyn CredentialStore) -> bool {
    use roster_client::store::CredentialKey;
    CredentialKey::ALL.iter().all(|key| store.get(*key).is_none())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn record(State(state): State<Arc<MockState>>, req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(Recorded {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        authorization,
    });
    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
}

fn auth_document(token: &str, user: &UserRecord) -> Value {
    let mut doc = serde_json::to_value(user).unwrap();
    doc["token"] = json!(token);
    doc
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return unauthorized("Bad credentials");
    }
    let user = state.user.lock().unwrap().clone();
    Json(auth_document(&state.token, &user)).into_response()
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@b.com" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "E-Mail already registered" })),
        )
            .into_response();
    }
    let user = UserRecord {
        id: 42,
        email: body["email"].as_str().unwrap_or_default().to_string(),
        first_name: body["firstName"].as_str().unwrap_or_default().to_string(),
        last_name: body["lastName"].as_str().unwrap_or_default().to_string(),
        role: Role::Member,
        unit: None,
    };
    *state.user.lock().unwrap() = user.clone();
    Json(auth_document("tok-new", &user)).into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let mode = *state.me.lock().unwrap();
    match mode {
        Mode::Hang => std::future::pending::<Response>().await,
        Mode::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Mode::Unauthorized | Mode::Invalid | Mode::SlowInvalid => unauthorized("Token expired"),
        Mode::Ok if !has_bearer(&headers) => unauthorized("Missing token"),
        Mode::Ok => Json(state.user.lock().unwrap().clone()).into_response(),
    }
}

async fn validate(State(state): State<Arc<MockState>>) -> Response {
    let mode = *state.validate.lock().unwrap();
    match mode {
        Mode::Hang => std::future::pending::<Response>().await,
        Mode::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Mode::Unauthorized => unauthorized("Token expired"),
        Mode::Invalid => Json(json!(false)).into_response(),
        Mode::SlowInvalid => {
            tokio::time::sleep(SLOW_ANSWER).await;
            Json(json!(false)).into_response()
        }
        Mode::Ok => Json(json!(true)).into_response(),
    }
}

async fn public_units() -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Ortsgruppe Nord" },
        { "id": 2, "name": "Ortsgruppe Süd" }
    ]))
}

async fn groups() -> Response {
    unauthorized("Token expired")
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({ "authorization": authorization }))
}

async fn profile(State(state): State<Arc<MockState>>) -> Json<UserRecord> {
    Json(state.user.lock().unwrap().clone())
}

async fn update_profile(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Json<UserRecord> {
    let mut user = state.user.lock().unwrap();
    user.email = body["email"].as_str().unwrap_or_default().to_string();
    user.first_name = body["firstName"].as_str().unwrap_or_default().to_string();
    user.last_name = body["lastName"].as_str().unwrap_or_default().to_string();
    // The profile endpoint reports a different role than the session; the
    // client must not adopt it.
    let mut answer = user.clone();
    answer.role = Role::Member;
    Json(answer)
}

async fn change_password(Json(body): Json<Value>) -> Response {
    if body["currentPassword"] == "secret" {
        Json(json!({})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Current password is wrong" })),
        )
            .into_response()
    }
}

async fn delete_profile() -> StatusCode {
    StatusCode::NO_CONTENT
}
