//! GitLab API error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the GitLab directory client.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("authentication failed ({status}): {body}")]
    Auth { status: StatusCode, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("GitLab API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl GitLabError {
    /// Classify a non-success status code and response body.
    pub fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth { status, body },
            StatusCode::NOT_FOUND => Self::NotFound(url.to_string()),
            _ => Self::Status { status, body },
        }
    }
}
