//! Tracked records and the merged display entry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a tracked installation or download.
///
/// `Starting → {Downloading | Installing} → {Completed | Error | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Starting,
    Downloading,
    Installing,
    Completed,
    Error,
    Cancelled,
}

impl ProgressStatus {
    /// Terminal states are followed only by removal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProgressStatus::Completed | ProgressStatus::Error | ProgressStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Starting => "starting",
            ProgressStatus::Downloading => "downloading",
            ProgressStatus::Installing => "installing",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Error => "error",
            ProgressStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side record of a bundle installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    pub bundle_id: String,
    pub bundle_name: String,
    pub profiles: Vec<String>,
    pub status: ProgressStatus,
    /// Percentage, 0-100.
    pub progress: f64,
    pub current_step: String,
    pub errors: Vec<String>,
    pub start_time: DateTime<Utc>,
}

impl Installation {
    pub(crate) fn new(id: String, bundle_id: &str, bundle_name: &str, profiles: &[String]) -> Self {
        Self {
            id,
            bundle_id: bundle_id.to_string(),
            bundle_name: bundle_name.to_string(),
            profiles: profiles.to_vec(),
            status: ProgressStatus::Starting,
            progress: 0.0,
            current_step: "Starting installation".to_string(),
            errors: Vec::new(),
            start_time: Utc::now(),
        }
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        push_unique(&mut self.errors, message.into());
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = ProgressStatus::Error;
        self.current_step = format!("Failed: {}", message);
        self.record_error(message);
    }

    pub(crate) fn complete(&mut self) {
        self.status = ProgressStatus::Completed;
        self.progress = 100.0;
        self.current_step = "Installation complete".to_string();
    }

    /// Returns false, leaving the record untouched, if it already finished.
    pub(crate) fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ProgressStatus::Cancelled;
        self.current_step = "Cancelled".to_string();
        true
    }
}

/// Client-side record of a single model download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDownload {
    pub id: String,
    pub model_id: String,
    pub model_name: String,
    pub status: ProgressStatus,
    /// Percentage, 0-100.
    pub progress: f64,
    pub current_step: String,
    pub start_time: DateTime<Utc>,
    pub errors: Vec<String>,
    /// The backend has reported this download at least once.
    #[serde(skip)]
    pub(crate) seen: bool,
}

impl ModelDownload {
    pub(crate) fn new(id: String, model_id: &str, model_name: &str) -> Self {
        Self {
            id,
            model_id: model_id.to_string(),
            model_name: model_name.to_string(),
            status: ProgressStatus::Downloading,
            progress: 0.0,
            current_step: "Waiting for download to start".to_string(),
            start_time: Utc::now(),
            errors: Vec::new(),
            seen: false,
        }
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        push_unique(&mut self.errors, message.into());
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = ProgressStatus::Error;
        self.current_step = format!("Failed: {}", message);
        self.record_error(message);
    }

    pub(crate) fn complete(&mut self) {
        self.status = ProgressStatus::Completed;
        self.progress = 100.0;
        self.current_step = "Download complete".to_string();
    }

    /// Returns false, leaving the record untouched, if it already finished.
    pub(crate) fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ProgressStatus::Cancelled;
        self.current_step = "Cancelled".to_string();
        true
    }
}

/// What a [`ProgressEntry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Bundle,
    Model,
}

/// Display view merging installations and model downloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub kind: EntryKind,
    pub id: String,
    pub name: String,
    pub status: ProgressStatus,
    pub progress: f64,
    pub current_step: String,
    pub errors: Vec<String>,
    pub start_time: DateTime<Utc>,
}

impl From<&Installation> for ProgressEntry {
    fn from(inst: &Installation) -> Self {
        Self {
            kind: EntryKind::Bundle,
            id: inst.id.clone(),
            name: inst.bundle_name.clone(),
            status: inst.status,
            progress: inst.progress,
            current_step: inst.current_step.clone(),
            errors: inst.errors.clone(),
            start_time: inst.start_time,
        }
    }
}

impl From<&ModelDownload> for ProgressEntry {
    fn from(dl: &ModelDownload) -> Self {
        Self {
            kind: EntryKind::Model,
            id: dl.id.clone(),
            name: dl.model_name.clone(),
            status: dl.status,
            progress: dl.progress,
            current_step: dl.current_step.clone(),
            errors: dl.errors.clone(),
            start_time: dl.start_time,
        }
    }
}

fn push_unique(errors: &mut Vec<String>, message: String) {
    if !errors.contains(&message) {
        errors.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ProgressStatus::Starting.is_terminal());
        assert!(!ProgressStatus::Downloading.is_terminal());
        assert!(!ProgressStatus::Installing.is_terminal());
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Error.is_terminal());
        assert!(ProgressStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_errors_are_deduplicated() {
        let mut inst = Installation::new("i1".into(), "flux", "Flux", &["low".to_string()]);
        inst.record_error("timeout");
        inst.record_error("timeout");
        inst.fail("timeout");
        assert_eq!(inst.errors, vec!["timeout"]);
        assert_eq!(inst.status, ProgressStatus::Error);
    }

    #[test]
    fn test_entry_from_download() {
        let mut dl = ModelDownload::new("d1".into(), "sdxl", "SDXL Base");
        dl.progress = 40.0;
        let entry = ProgressEntry::from(&dl);
        assert_eq!(entry.kind, EntryKind::Model);
        assert_eq!(entry.name, "SDXL Base");
        assert_eq!(entry.status, ProgressStatus::Downloading);
        assert_eq!(entry.progress, 40.0);
    }

    #[test]
    fn test_cancel_leaves_finished_records_alone() {
        let mut dl = ModelDownload::new("d2".into(), "sdxl", "SDXL");
        dl.complete();
        assert!(!dl.cancel());
        assert_eq!(dl.status, ProgressStatus::Completed);
        assert_eq!(dl.progress, 100.0);

        let mut inst = Installation::new("i2".into(), "flux", "Flux", &["low".to_string()]);
        assert!(inst.cancel());
        assert_eq!(inst.status, ProgressStatus::Cancelled);
        assert!(!inst.cancel());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ProgressStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
