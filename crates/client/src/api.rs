//! Typed wrappers for the roster backend endpoints.
//!
//! Every call goes through the [`Gateway`], so token injection and the
//! authorization-failure handling apply uniformly. This layer only knows
//! paths, payload shapes, and the generic message used when the backend
//! does not supply one.

use std::sync::Arc;

use reqwest::Method;
use roster_core::user::{PasswordChange, ProfileUpdate, Unit, UserRecord};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gateway::Gateway;

pub const PATH_LOGIN: &str = "/auth/login";
pub const PATH_REGISTER: &str = "/auth/register";
pub const PATH_ME: &str = "/auth/me";
pub const PATH_VALIDATE: &str = "/auth/validate";
pub const PATH_PUBLIC_UNITS: &str = "/units/public";
pub const PATH_PROFILE: &str = "/user/profile";
pub const PATH_PROFILE_PASSWORD: &str = "/user/profile/password";

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

/// Flat `{token, id, email, firstName, lastName, role, unit?}` answer of
/// the login and registration endpoints.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    #[serde(flatten)]
    user: UserRecord,
}

/// Successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserRecord,
    /// The complete response document, for fields beyond token and user.
    pub raw: serde_json::Value,
}

impl AuthPayload {
    fn from_value(raw: serde_json::Value) -> Result<Self, ApiError> {
        let parsed: AuthResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ApiError::Decode(format!("auth response: {e}")))?;
        if parsed.token.is_empty() {
            return Err(ApiError::Decode("auth response carries an empty token".into()));
        }
        Ok(Self {
            token: parsed.token,
            user: parsed.user,
            raw,
        })
    }
}

/// Answer of `GET /auth/validate`: a bare boolean or `{"valid": bool}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValidateResponse {
    Bare(bool),
    Wrapped { valid: bool },
}

/// Client for the roster backend.
#[derive(Clone)]
pub struct RosterApi {
    gateway: Arc<Gateway>,
}

impl RosterApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Exchange email and password for a token and user.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let body = LoginRequest { email, password };
        let raw: serde_json::Value = self
            .gateway
            .send_json(Method::POST, PATH_LOGIN, &body, "Login failed")
            .await?;
        AuthPayload::from_value(raw)
    }

    /// Create an account; answers like [`login`](Self::login).
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<AuthPayload, ApiError> {
        let body = RegisterRequest {
            email,
            password,
            first_name,
            last_name,
        };
        let raw: serde_json::Value = self
            .gateway
            .send_json(Method::POST, PATH_REGISTER, &body, "Registration failed")
            .await?;
        AuthPayload::from_value(raw)
    }

    /// Fetch the user the current token belongs to.
    pub async fn me(&self) -> Result<UserRecord, ApiError> {
        self.gateway
            .get_json(PATH_ME, "Failed to fetch user data")
            .await
    }

    /// Ask the backend whether the current token is still valid.
    pub async fn validate(&self) -> Result<bool, ApiError> {
        let answer: ValidateResponse = self
            .gateway
            .get_json(PATH_VALIDATE, "Token validation failed")
            .await?;
        Ok(match answer {
            ValidateResponse::Bare(valid) | ValidateResponse::Wrapped { valid } => valid,
        })
    }

    /// Units selectable during registration. Needs no token.
    pub async fn public_units(&self) -> Result<Vec<Unit>, ApiError> {
        self.gateway
            .get_json(PATH_PUBLIC_UNITS, "Failed to load units")
            .await
    }

    pub async fn profile(&self) -> Result<UserRecord, ApiError> {
        self.gateway
            .get_json(PATH_PROFILE, "Failed to load profile")
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserRecord, ApiError> {
        self.gateway
            .send_json(Method::PUT, PATH_PROFILE, update, "Failed to update profile")
            .await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.gateway
            .send_unit(
                Method::PUT,
                PATH_PROFILE_PASSWORD,
                Some(change),
                "Failed to change password",
            )
            .await
    }

    /// Delete the signed-in user's account.
    pub async fn delete_profile(&self) -> Result<(), ApiError> {
        self.gateway
            .send_unit::<()>(Method::DELETE, PATH_PROFILE, None, "Failed to delete profile")
            .await
    }
}
