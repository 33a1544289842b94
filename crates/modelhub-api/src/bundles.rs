//! Bundle endpoints.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use tracing::info;

use crate::client::ApiClient;
use crate::error::Result;
use crate::types::{Ack, Bundle, BundleDraft, InstalledBundle};

#[derive(Debug, Serialize)]
struct ProfileRequest<'a> {
    profile: &'a str,
}

impl ApiClient {
    /// List all bundles.
    pub async fn list_bundles(&self) -> Result<Vec<Bundle>> {
        self.get_json(&["bundles"]).await
    }

    /// Fetch a single bundle.
    pub async fn get_bundle(&self, bundle_id: &str) -> Result<Bundle> {
        self.get_json(&["bundles", bundle_id]).await
    }

    /// Create a bundle.
    pub async fn create_bundle(&self, draft: &BundleDraft) -> Result<Bundle> {
        info!("Creating bundle '{}'", draft.name);
        let request = self.request(Method::POST, &["bundles"])?.json(draft);
        self.send_json(request).await
    }

    /// Replace a bundle's definition.
    pub async fn update_bundle(&self, bundle_id: &str, draft: &BundleDraft) -> Result<Bundle> {
        info!("Updating bundle '{}'", bundle_id);
        let request = self.request(Method::PUT, &["bundles", bundle_id])?.json(draft);
        self.send_json(request).await
    }

    /// Delete a bundle definition.
    pub async fn delete_bundle(&self, bundle_id: &str) -> Result<Ack> {
        info!("Deleting bundle '{}'", bundle_id);
        let request = self.request(Method::DELETE, &["bundles", bundle_id])?;
        self.send_json(request).await
    }

    /// Start installing one profile of a bundle.
    pub async fn install_bundle(&self, bundle_id: &str, profile: &str) -> Result<Ack> {
        info!("Installing bundle '{}' profile '{}'", bundle_id, profile);
        let request = self
            .request(Method::POST, &["bundles", bundle_id, "install"])?
            .json(&ProfileRequest { profile });
        self.send_json(request).await
    }

    /// Uninstall one profile of a bundle.
    pub async fn uninstall_bundle(&self, bundle_id: &str, profile: &str) -> Result<Ack> {
        info!("Uninstalling bundle '{}' profile '{}'", bundle_id, profile);
        let request = self
            .request(Method::POST, &["bundles", bundle_id, "uninstall"])?
            .json(&ProfileRequest { profile });
        self.send_json(request).await
    }

    /// Bundles currently installed on the backend.
    pub async fn installed_bundles(&self) -> Result<Vec<InstalledBundle>> {
        self.get_json(&["bundles", "installed"]).await
    }

    /// Upload a bundle archive (zip).
    pub async fn upload_bundle(&self, archive: &Path) -> Result<Bundle> {
        let form = Form::new().part("file", file_part(archive).await?);
        let request = self
            .request(Method::POST, &["bundles", "upload"])?
            .multipart(form);
        self.send_json(request).await
    }

    /// Export a bundle as a zip archive.
    pub async fn export_bundle(&self, bundle_id: &str) -> Result<Vec<u8>> {
        let request = self.request(Method::GET, &["bundles", bundle_id, "export"])?;
        self.send_bytes(request).await
    }
}

/// Read a local file into a multipart part named after the file.
pub(crate) async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(Part::bytes(bytes).file_name(filename))
}
