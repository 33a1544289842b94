//! CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use modelhub_api::{paths, ApiClient, ClientConfig};
use modelhub_progress::{
    NotificationLog, Notifiers, ProgressTracker, TracingNotifier, TrackerConfig,
};

pub mod auth;
pub mod bundles;
pub mod config;
pub mod downloads;
pub mod files;
pub mod models;
pub mod notifications;
pub mod progress;
pub mod workflows;

/// Shared state for a single CLI invocation.
pub(crate) struct Context {
    pub client: ApiClient,
    pub data_dir: PathBuf,
}

impl Context {
    pub(crate) fn new(config: ClientConfig) -> miette::Result<Self> {
        let data_dir = config.data_dir.clone();
        let client = ApiClient::new(config)
            .map_err(|e| miette::miette!("Failed to create client: {}", e))?;
        Ok(Self { client, data_dir })
    }

    pub(crate) fn notification_log(&self) -> NotificationLog {
        NotificationLog::new(paths::notifications_path(&self.data_dir))
    }

    /// A tracker that logs notifications and persists them for `modelhub notifications`.
    pub(crate) fn tracker(&self) -> ProgressTracker {
        let notifier = Notifiers::new()
            .with(TracingNotifier)
            .with(self.notification_log());
        ProgressTracker::new(
            Arc::new(self.client.clone()),
            Arc::new(notifier),
            TrackerConfig::default(),
        )
    }
}

/// Human-readable byte size.
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Print a backend acknowledgement, falling back to `default` when it has no message.
pub(crate) fn print_ack(ack: &modelhub_api::Ack, default: &str) {
    println!("{}", ack.message.as_deref().unwrap_or(default));
}
