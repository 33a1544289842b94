//! REST client for the modelhub model-management backend.
//!
//! The backend manages AI model files, bundles (installable collections of
//! models and workflows), a remote file tree and a few settings. This crate
//! wraps its HTTP API with typed requests and responses.
//!
//! ## Usage
//!
//! ```ignore
//! use modelhub_api::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(ClientConfig::from_env())?;
//! for bundle in client.list_bundles().await? {
//!     println!("{}", bundle.name);
//! }
//! ```

mod auth;
mod bundles;
mod client;
mod config;
mod error;
mod files;
mod models;
pub mod paths;
mod settings;
pub mod types;
mod workflows;

pub use auth::TokenStore;
pub use client::ApiClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, Result};
pub use types::{
    Ack, BaseDirConfig, Bundle, BundleDraft, BundleProfile, CredentialsChange, DownloadState,
    DownloadStatus, DownloadStatusMap, FileEntry, FileProperties, InstalledBundle, Model,
    StopDownloadResponse, TokenConfig, Workflow,
};
