//! GitLab API error types.

use thiserror::Error;

use crate::http::HttpError;
use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitLab API.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Host or endpoint could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GitLabError {
    /// Classify an HTTP status code and response body into a typed error.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("{status}: {body}")),
            404 => Self::NotFound(body.to_string()),
            429 => Self::RateLimited(body.to_string()),
            _ => Self::Api {
                status,
                message: body.to_string(),
            },
        }
    }
}

/// Convert GitLabError to platform-agnostic PlatformError.
impl From<GitLabError> for PlatformError {
    fn from(err: GitLabError) -> Self {
        match err {
            GitLabError::Http(HttpError::Timeout(msg)) => PlatformError::timeout(msg),
            GitLabError::Http(e) => PlatformError::network(e.to_string()),
            GitLabError::Json(e) => PlatformError::internal(format!("JSON parse error: {e}")),
            GitLabError::Api { status, message } => PlatformError::api(status, message),
            GitLabError::RateLimited(message) => PlatformError::RateLimited { message },
            GitLabError::Auth(_) => PlatformError::AuthRequired,
            GitLabError::NotFound(resource) => PlatformError::not_found(resource),
            GitLabError::InvalidUrl(msg) | GitLabError::Config(msg) => {
                PlatformError::internal(msg)
            }
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitLabError) -> String {
    match err {
        GitLabError::Http(HttpError::Timeout(_)) => "Request timed out".to_string(),
        GitLabError::Http(_) => "Network error".to_string(),
        GitLabError::Json(_) => "JSON parse error".to_string(),
        GitLabError::Api { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {message}")
            }
        }
        GitLabError::RateLimited(_) => "Rate limited".to_string(),
        GitLabError::Auth(_) => "Authentication failed".to_string(),
        GitLabError::NotFound(what) => format!("Not found: {what}"),
        GitLabError::InvalidUrl(msg) => format!("Invalid URL: {msg}"),
        GitLabError::Config(msg) => format!("Config: {msg}"),
    }
}
