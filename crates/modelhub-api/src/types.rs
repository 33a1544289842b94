//! Wire types exchanged with the backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A model in the backend catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    /// Model category (checkpoint, lora, vae, ...).
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(default)]
    pub filename: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// State of a server-side model download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Queued,
    Downloading,
    Completed,
    Error,
    Cancelled,
    /// Any status this client does not know; never active.
    #[serde(other)]
    Unknown,
}

impl DownloadState {
    /// Whether the backend is still working on this download.
    pub fn is_active(self) -> bool {
        matches!(self, DownloadState::Queued | DownloadState::Downloading)
    }
}

/// One entry of the download-status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadStatus {
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub model_name: Option<String>,
    pub status: DownloadState,
    /// Percentage, 0-100.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub downloaded: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Download-status report keyed by model id.
pub type DownloadStatusMap = HashMap<String, DownloadStatus>;

/// Response to a stop-download request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopDownloadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Hardware-specific variant of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Model ids included in this profile.
    #[serde(default)]
    pub models: Vec<String>,
}

/// A named collection of models and workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub profiles: Vec<BundleProfile>,
    #[serde(default)]
    pub workflows: Vec<String>,
}

impl Bundle {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&BundleProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

/// Body for creating or updating a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub profiles: Vec<BundleProfile>,
    #[serde(default)]
    pub workflows: Vec<String>,
}

/// A bundle reported as installed, with the profiles that are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledBundle {
    pub bundle_id: String,
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl InstalledBundle {
    /// Whether every requested profile is installed.
    pub fn covers(&self, profiles: &[String]) -> bool {
        profiles.iter().all(|p| self.profiles.contains(p))
    }
}

/// A workflow file known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Directory listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: Option<u64>,
    /// Modification time as reported by the backend (ISO 8601).
    #[serde(default)]
    pub modified: Option<String>,
}

/// Detailed file or directory properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProperties {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
}

/// Third-party download tokens used by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huggingface_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civitai_token: Option<String>,
}

/// Backend base directory setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDirConfig {
    pub base_dir: String,
}

/// Credentials change request.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsChange {
    pub current_password: String,
    pub new_username: Option<String>,
    pub new_password: Option<String>,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_status_map_from_backend_json() {
        let json = r#"{
            "sdxl-base": {"model_id": "sdxl-base", "status": "downloading", "progress": 42.5},
            "vae-ft": {"model_id": "vae-ft", "status": "error", "progress": 10, "error": "disk full"}
        }"#;
        let map: DownloadStatusMap = serde_json::from_str(json).unwrap();
        assert_eq!(map["sdxl-base"].status, DownloadState::Downloading);
        assert!(map["sdxl-base"].status.is_active());
        assert_eq!(map["vae-ft"].error.as_deref(), Some("disk full"));
        assert!(!map["vae-ft"].status.is_active());
    }

    #[test]
    fn test_unrecognized_download_status_still_decodes() {
        let json = r#"{
            "sdxl-base": {"model_id": "sdxl-base", "status": "verifying", "progress": 100},
            "vae-ft": {"model_id": "vae-ft", "status": "queued", "progress": 0}
        }"#;
        let map: DownloadStatusMap = serde_json::from_str(json).unwrap();
        assert_eq!(map["sdxl-base"].status, DownloadState::Unknown);
        assert!(!map["sdxl-base"].status.is_active());
        assert!(map["vae-ft"].status.is_active());
    }

    #[test]
    fn test_model_type_field_rename() {
        let json = r#"{"id": "m1", "name": "Model One", "type": "checkpoint", "installed": true}"#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model.model_type, "checkpoint");
        assert!(model.installed);
        assert!(model.size.is_none());
    }

    #[test]
    fn test_installed_bundle_covers_profiles() {
        let installed = InstalledBundle {
            bundle_id: "flux".into(),
            profiles: vec!["low-vram".into(), "high-vram".into()],
        };
        assert!(installed.covers(&["low-vram".to_string()]));
        assert!(!installed.covers(&["low-vram".to_string(), "cpu".to_string()]));
    }

    #[test]
    fn test_ack_defaults_to_success() {
        let ack: Ack = serde_json::from_str("{}").unwrap();
        assert!(ack.success);
    }
}
