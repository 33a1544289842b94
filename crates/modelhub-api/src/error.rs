//! Error types for backend API operations.

use thiserror::Error;

/// Errors that can occur while talking to the modelhub backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Server rejected the bearer token. The stored token has been cleared.
    #[error("Not authenticated. Log in again with: modelhub login <TOKEN>")]
    Unauthorized,

    /// Server answered 2xx but reported the operation as unsuccessful.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Server is not running or not reachable.
    #[error("Backend not reachable at {0}")]
    Unreachable(String),

    /// The configured base URL or a request path could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O error (token file, upload source, download target).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Whether the backend answered with 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
