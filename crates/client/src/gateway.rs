//! The single outgoing-call path to the backend.
//!
//! [`Gateway`] runs every registered [`Middleware`] around a `reqwest`
//! exchange and carries out the [`Intent`]s they return: bearer header
//! injection before the call, session invalidation and login redirect
//! after it. A call is sent exactly once; there is no retry, queueing, or
//! backoff. Errors are always propagated to the caller, also after the
//! gateway has acted on them.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::middleware::{AuthMiddleware, Intent, Middleware, RequestContext, ResponseContext};
use crate::navigation::Navigator;
use crate::session::Session;

/// HTTP gateway bound to one backend and one session.
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Gateway {
    /// Build a gateway from configuration, with [`AuthMiddleware`]
    /// registered.
    pub fn new(
        config: &ClientConfig,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(client, config.base_url.clone(), session, navigator)
            .with_middleware(Arc::new(AuthMiddleware::new(config.login_path.clone()))))
    }

    /// Create a gateway reusing an existing [`reqwest::Client`]. No
    /// middleware is registered.
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            navigator,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware. Hooks run in registration order.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Send a request and return the raw successful response.
    ///
    /// * `fallback` - message used when a failed response carries none.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        fallback: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let ctx = RequestContext {
            method: method.clone(),
            path: path.to_string(),
            token: self.session.token(),
        };

        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path));

        for intent in self.middleware.iter().flat_map(|m| m.before_request(&ctx)) {
            match intent {
                Intent::AttachBearer(token) => request = request.bearer_auth(token),
                other => self.apply(other),
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "Backend unreachable");
            ApiError::Connectivity(e)
        })?;

        let status = response.status();
        let ctx = ResponseContext {
            method: method.clone(),
            path: path.to_string(),
            status: status.as_u16(),
            location: self.navigator.current_location(),
        };
        for intent in self.middleware.iter().flat_map(|m| m.after_response(&ctx)) {
            self.apply(intent);
        }

        if status.is_success() {
            tracing::debug!(method = %method, path, status = status.as_u16(), "Backend call succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body).unwrap_or_else(|| fallback.to_string());
        tracing::debug!(method = %method, path, status = status.as_u16(), %message, "Backend call failed");

        if status.as_u16() == 401 {
            Err(ApiError::Unauthorized { message })
        } else {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// `GET` a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, None, fallback).await?;
        parse_json(response).await
    }

    /// Send a JSON body and decode a JSON answer.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, Some(body), fallback).await?;
        parse_json(response).await
    }

    /// Send a request whose answer body is ignored.
    pub async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        fallback: &str,
    ) -> Result<(), ApiError> {
        self.send(method, path, body, fallback).await?;
        Ok(())
    }

    fn apply(&self, intent: Intent) {
        match intent {
            Intent::ClearSession => {
                tracing::warn!("Authorization failure, clearing session");
                self.session.invalidate();
            }
            Intent::Redirect(path) => self.navigator.navigate(&path),
            Intent::AttachBearer(_) => {
                tracing::debug!("Bearer intent outside request phase ignored");
            }
        }
    }
}

/// Decode a successful response body.
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(ApiError::Connectivity)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, then `error`. Non-JSON or empty bodies yield `None`.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}
