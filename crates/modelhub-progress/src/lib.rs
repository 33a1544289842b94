//! # Install/download progress tracking
//!
//! Keeps client-side state for bundle installations and model downloads
//! that run on the modelhub backend, and keeps it current by polling.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ start / cancel  │ --> │ ProgressTracker │ --> │  subscribe()    │
//! │ remove / restore│     │  (two pollers)  │     │  (watch snaps)  │
//! └─────────────────┘     └────────┬────────┘     └─────────────────┘
//!                                  │
//!                     ┌────────────┴────────────┐
//!                     │                         │
//!              ┌──────┴──────┐           ┌──────┴──────┐
//!              │   Backend   │           │  Notifier   │
//!              │ (ApiClient) │           │  (toasts)   │
//!              └─────────────┘           └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use modelhub_api::ApiClient;
//! use modelhub_progress::{ProgressTracker, TracingNotifier, TrackerConfig};
//!
//! let client = ApiClient::from_env()?;
//! let tracker = ProgressTracker::new(
//!     Arc::new(client),
//!     Arc::new(TracingNotifier),
//!     TrackerConfig::default(),
//! );
//! let id = tracker
//!     .start_installation("flux", "Flux Dev", &["low-vram".to_string()])
//!     .await?;
//! ```

mod backend;
mod config;
mod error;
mod notify;
mod poller;
mod record;
mod tracker;

pub use backend::ProgressBackend;
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use notify::{
    Notification, NotificationLevel, NotificationLog, Notifier, Notifiers, TracingNotifier,
    NOTIFICATION_EXPIRY,
};
pub use record::{EntryKind, Installation, ModelDownload, ProgressEntry, ProgressStatus};
pub use tracker::ProgressTracker;
