use roster_core::error::CoreError;

/// Errors from writing to a credential store.
///
/// Reads never produce this: a missing or unreadable store reads as empty.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from a call through the [`Gateway`](crate::gateway::Gateway).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered 401. The gateway has already acted on it
    /// (unless the call was a login or registration attempt).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The backend answered with any other non-2xx status.
    #[error("{message} (status {status})")]
    Rejected { status: u16, message: String },

    /// No response was obtained (DNS, refused connection, TLS, timeout).
    #[error("Backend unreachable: {0}")]
    Connectivity(#[source] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// `true` when no response was obtained at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Connectivity(_))
    }

    /// `true` for the distinguished authorization-failure status.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// `true` for 5xx answers, which signal a backend outage rather than a
    /// verdict about the caller.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Rejected { status, .. } if *status >= 500)
    }
}

/// Errors surfaced by [`AuthContext`](crate::auth::AuthContext) operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The OAuth provider redirected back with an error or without a token.
    #[error("OAuth login failed: {0}")]
    OAuth(String),

    /// The session bootstrap already ran for this context.
    #[error("Session bootstrap already ran")]
    AlreadyInitialized,
}
