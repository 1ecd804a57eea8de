//! Backend-driven OAuth login.
//!
//! The front-end sends the user to the backend's authorization endpoint;
//! the backend talks to the provider and redirects back to
//! `/oauth2/callback?token=...` (or `?error=...`).

use std::fmt;

use reqwest::Url;

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Github,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Github => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL that starts the OAuth flow for `provider`.
pub fn authorization_url(base_url: &str, provider: Provider) -> String {
    format!(
        "{}/oauth2/authorization/{}",
        base_url.trim_end_matches('/'),
        provider
    )
}

/// Parsed OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthCallback {
    /// The backend issued a session token.
    Token(String),
    /// The provider or backend reported an error.
    Failed(String),
    /// Neither a token nor an error was present.
    Missing,
}

impl OAuthCallback {
    /// Parse the query part of a callback URL (`token=...` / `error=...`).
    ///
    /// Accepts a bare query (with or without a leading `?`) or a full URL.
    /// An `error` parameter takes precedence over a token.
    pub fn from_query(input: &str) -> Self {
        let input = input.trim();
        let url = Url::parse(input)
            .or_else(|_| Url::parse(&format!("http://callback/?{}", input.trim_start_matches('?'))));

        let Ok(url) = url else {
            return OAuthCallback::Missing;
        };

        let mut token = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "token" if !value.is_empty() => token = Some(value.into_owned()),
                "error" if !value.is_empty() => error = Some(value.into_owned()),
                _ => {}
            }
        }

        match (error, token) {
            (Some(error), _) => OAuthCallback::Failed(error),
            (None, Some(token)) => OAuthCallback::Token(token),
            (None, None) => OAuthCallback::Missing,
        }
    }
}
