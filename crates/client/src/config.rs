use std::path::PathBuf;
use std::time::Duration;

/// Backend URL used when no origin or override applies.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Login entry point the gateway redirects to on session invalidation.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against a
/// backend on `localhost:8080`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash, e.g. `https://verband.de/api`.
    pub base_url: String,
    /// Location of the login entry point (default: `/login`).
    pub login_path: String,
    /// File backing the durable credential store.
    pub credentials_path: PathBuf,
    /// HTTP request timeout (default: `30` seconds).
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                              |
    /// |-------------------------------|--------------------------------------|
    /// | `ROSTER_ORIGIN`               | --                                   |
    /// | `ROSTER_API_URL`              | `http://localhost:8080/api`          |
    /// | `ROSTER_LOGIN_PATH`           | `/login`                             |
    /// | `ROSTER_CREDENTIALS_PATH`     | `<home>/.roster/credentials.json`    |
    /// | `ROSTER_REQUEST_TIMEOUT_SECS` | `30`                                 |
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let origin = std::env::var("ROSTER_ORIGIN").ok();
        let api_url = std::env::var("ROSTER_API_URL").ok();
        let base_url = resolve_base_url(origin.as_deref(), api_url.as_deref());

        let login_path =
            std::env::var("ROSTER_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.into());

        let credentials_path = std::env::var("ROSTER_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_credentials_path());

        let request_timeout_secs: u64 = std::env::var("ROSTER_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            base_url,
            login_path,
            credentials_path,
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    /// Configuration pointing at an explicit backend, with defaults elsewhere.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_trailing_slash(&base_url.into()),
            login_path: DEFAULT_LOGIN_PATH.into(),
            credentials_path: default_credentials_path(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Resolve the backend base URL.
///
/// A non-local origin (not containing `localhost` or `127.0.0.1`) serves
/// the API itself under `<origin>/api`. Otherwise the explicit override
/// wins, then [`DEFAULT_API_URL`].
pub fn resolve_base_url(origin: Option<&str>, api_override: Option<&str>) -> String {
    if let Some(origin) = origin.map(str::trim).filter(|o| !o.is_empty()) {
        if !is_local_origin(origin) {
            return format!("{}/api", trim_trailing_slash(origin));
        }
    }

    let url = api_override
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_API_URL);
    trim_trailing_slash(url)
}

fn is_local_origin(origin: &str) -> bool {
    origin.contains("localhost") || origin.contains("127.0.0.1")
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".roster")
        .join("credentials.json")
}
