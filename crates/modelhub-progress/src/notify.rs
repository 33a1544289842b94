//! User-facing notifications (toasts).

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::TrackerError;

/// How long a persisted notification stays visible.
pub const NOTIFICATION_EXPIRY: Duration = Duration::from_secs(30);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }
}

/// Receives notifications emitted by the tracker.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!("{}: {}", n.title, n.message)
            }
            NotificationLevel::Warning => warn!("{}: {}", n.title, n.message),
            NotificationLevel::Error => error!("{}: {}", n.title, n.message),
        }
    }
}

/// Persists recent notifications to a JSON file, dropping expired ones.
///
/// Clones share the same file lock. Inside a Tokio runtime, writes made
/// through [`Notifier::notify`] run on the blocking pool.
#[derive(Clone)]
pub struct NotificationLog {
    path: PathBuf,
    expiry: Duration,
    lock: Arc<Mutex<()>>,
}

impl NotificationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expiry: NOTIFICATION_EXPIRY,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Override the expiry window.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Notifications still inside the expiry window, oldest first.
    pub fn load(&self) -> Result<Vec<Notification>, TrackerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_fresh(Utc::now())
    }

    /// Append a notification, pruning expired entries.
    pub fn append(&self, notification: Notification) -> Result<(), TrackerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_fresh(Utc::now())?;
        entries.push(notification);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    /// Remove every persisted notification.
    pub fn clear(&self) -> Result<(), TrackerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn read_fresh(&self, now: DateTime<Utc>) -> Result<Vec<Notification>, TrackerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries: Vec<Notification> = serde_json::from_str(&content)?;
        let expiry = chrono::Duration::from_std(self.expiry)
            .unwrap_or_else(|_| chrono::Duration::weeks(52));
        let mut fresh: Vec<Notification> = entries
            .into_iter()
            .filter(|n| now.signed_duration_since(n.timestamp) < expiry)
            .collect();
        // Background writes may land out of order.
        fresh.sort_by_key(|n| n.timestamp);
        Ok(fresh)
    }

    fn persist(&self, notification: Notification) {
        if let Err(e) = self.append(notification) {
            warn!("Failed to persist notification to {:?}: {}", self.path, e);
        }
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let log = self.clone();
                handle.spawn_blocking(move || log.persist(notification));
            }
            Err(_) => self.persist(notification),
        }
    }
}

/// Fans a notification out to several notifiers.
#[derive(Default, Clone)]
pub struct Notifiers {
    targets: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.targets.push(Arc::new(notifier));
        self
    }
}

impl Notifier for Notifiers {
    fn notify(&self, notification: Notification) {
        for target in &self.targets {
            target.notify(notification.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = NotificationLog::new(dir.path().join("notifications.json"));

        log.notify(Notification::success("Installed", "Flux Dev is ready"));
        log.notify(Notification::error("Download failed", "disk full"));

        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, NotificationLevel::Success);
        assert_eq!(entries[1].message, "disk full");
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.json");

        let mut stale = Notification::info("Old", "from a previous session");
        stale.timestamp = Utc::now() - chrono::Duration::seconds(31);
        fs::write(&path, serde_json::to_string(&vec![stale]).unwrap()).unwrap();

        let log = NotificationLog::new(&path);
        assert!(log.load().unwrap().is_empty());

        log.notify(Notification::info("New", "fresh"));
        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "New");
    }

    #[test]
    fn test_custom_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.json");

        let mut older = Notification::error("Earlier", "two minutes ago");
        older.timestamp = Utc::now() - chrono::Duration::seconds(120);
        fs::write(&path, serde_json::to_string(&vec![older]).unwrap()).unwrap();

        assert!(NotificationLog::new(&path).load().unwrap().is_empty());
        let log = NotificationLog::new(&path).with_expiry(Duration::from_secs(600));
        assert_eq!(log.load().unwrap().len(), 1);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let log = NotificationLog::new(dir.path().join("n.json"));
        log.notify(Notification::warning("Slow", "backend is slow"));
        log.clear().unwrap();
        assert!(log.load().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_notify_inside_runtime_writes_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let log = NotificationLog::new(dir.path().join("notifications.json"));

        log.notify(Notification::info("Download started", "Downloading SDXL"));
        log.notify(Notification::success("Download complete", "SDXL is ready"));

        let mut entries = Vec::new();
        for _ in 0..100 {
            entries = log.load().unwrap();
            if entries.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Download started");
        assert_eq!(entries[1].level, NotificationLevel::Success);
    }

    #[test]
    fn test_fan_out() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let notifiers = Notifiers::new()
            .with(TracingNotifier)
            .with(NotificationLog::new(&a))
            .with(NotificationLog::new(&b));

        notifiers.notify(Notification::success("Done", "all good"));

        assert_eq!(NotificationLog::new(&a).load().unwrap().len(), 1);
        assert_eq!(NotificationLog::new(&b).load().unwrap().len(), 1);
    }
}
