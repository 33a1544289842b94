//! Error types for progress tracking.

use modelhub_api::ApiError;
use thiserror::Error;

/// Errors returned by the progress tracker and notification log.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No record with this id is tracked.
    #[error("No tracked item with id '{0}'")]
    NotFound(String),

    /// The record already reached a terminal state.
    #[error("'{0}' has already finished")]
    AlreadyFinished(String),

    /// An installation was requested without any profile.
    #[error("At least one profile is required to install a bundle")]
    NoProfiles,

    /// I/O error (notification log).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (notification log).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
