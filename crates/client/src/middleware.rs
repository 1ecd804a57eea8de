//! Request/response hooks for the gateway.
//!
//! Hooks are pure: they inspect a context and return [`Intent`]s. The
//! [`Gateway`](crate::gateway::Gateway) is the only place intents are
//! carried out, which keeps storage writes and redirects out of the hooks
//! and makes them testable without either.

use reqwest::Method;

/// Request about to be sent.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Endpoint path relative to the base URL, e.g. `/auth/me`.
    pub path: String,
    /// Token currently in the credential store.
    pub token: Option<String>,
}

/// Response that just arrived.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub method: Method,
    pub path: String,
    pub status: u16,
    /// Navigation location at the time the response arrived.
    pub location: String,
}

/// Side effect requested by a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Send `Authorization: Bearer <token>`.
    AttachBearer(String),
    /// Clear token and user, durable and in memory.
    ClearSession,
    /// Navigate to the given path.
    Redirect(String),
}

/// A cross-cutting behaviour applied to every gateway call.
pub trait Middleware: Send + Sync {
    fn before_request(&self, _ctx: &RequestContext) -> Vec<Intent> {
        Vec::new()
    }

    fn after_response(&self, _ctx: &ResponseContext) -> Vec<Intent> {
        Vec::new()
    }
}

/// Paths whose 401 means "wrong credentials", not "session expired".
const AUTH_ATTEMPT_PATHS: &[&str] = &["/auth/login", "/auth/register"];

/// `true` when `path` targets the login or registration endpoint.
pub fn is_auth_attempt(path: &str) -> bool {
    AUTH_ATTEMPT_PATHS.iter().any(|p| path.contains(p))
}

/// Attaches the bearer token and reacts to authorization failures.
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    login_path: String,
}

impl AuthMiddleware {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }
}

impl Middleware for AuthMiddleware {
    fn before_request(&self, ctx: &RequestContext) -> Vec<Intent> {
        match &ctx.token {
            Some(token) if !token.is_empty() => vec![Intent::AttachBearer(token.clone())],
            _ => Vec::new(),
        }
    }

    fn after_response(&self, ctx: &ResponseContext) -> Vec<Intent> {
        if ctx.status != 401 || is_auth_attempt(&ctx.path) {
            return Vec::new();
        }

        let mut intents = vec![Intent::ClearSession];
        if !ctx.location.contains(&self.login_path) {
            intents.push(Intent::Redirect(self.login_path.clone()));
        }
        intents
    }
}
