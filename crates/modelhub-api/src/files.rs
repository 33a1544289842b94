//! Remote file-manager endpoints.

use std::path::Path;

use reqwest::multipart::Form;
use reqwest::Method;
use serde::Serialize;
use tracing::info;

use crate::bundles::file_part;
use crate::client::ApiClient;
use crate::error::Result;
use crate::types::{Ack, FileEntry, FileProperties};

#[derive(Debug, Serialize)]
struct PathRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    source: &'a str,
    destination: &'a str,
}

impl ApiClient {
    /// List a directory. An empty path lists the base directory.
    pub async fn list_files(&self, path: &str) -> Result<Vec<FileEntry>> {
        let request = self
            .request(Method::GET, &["files"])?
            .query(&[("path", path)]);
        self.send_json(request).await
    }

    /// Detailed properties of a file or directory.
    pub async fn file_properties(&self, path: &str) -> Result<FileProperties> {
        let request = self
            .request(Method::GET, &["files", "properties"])?
            .query(&[("path", path)]);
        self.send_json(request).await
    }

    /// Create a directory.
    pub async fn create_directory(&self, path: &str) -> Result<Ack> {
        info!("Creating directory '{}'", path);
        let request = self
            .request(Method::POST, &["files", "directory"])?
            .json(&PathRequest { path });
        self.send_json(request).await
    }

    /// Rename or move a file.
    pub async fn rename_file(&self, source: &str, destination: &str) -> Result<Ack> {
        info!("Renaming '{}' to '{}'", source, destination);
        let request = self
            .request(Method::POST, &["files", "rename"])?
            .json(&MoveRequest {
                source,
                destination,
            });
        self.send_json(request).await
    }

    /// Copy a file.
    pub async fn copy_file(&self, source: &str, destination: &str) -> Result<Ack> {
        info!("Copying '{}' to '{}'", source, destination);
        let request = self
            .request(Method::POST, &["files", "copy"])?
            .json(&MoveRequest {
                source,
                destination,
            });
        self.send_json(request).await
    }

    /// Delete a file or directory.
    pub async fn delete_file(&self, path: &str) -> Result<Ack> {
        info!("Deleting '{}'", path);
        let request = self
            .request(Method::DELETE, &["files"])?
            .query(&[("path", path)]);
        self.send_json(request).await
    }

    /// Upload a local file into a remote directory.
    pub async fn upload_file(&self, local: &Path, remote_dir: &str) -> Result<FileEntry> {
        let form = Form::new()
            .text("path", remote_dir.to_string())
            .part("file", file_part(local).await?);
        let request = self
            .request(Method::POST, &["files", "upload"])?
            .multipart(form);
        self.send_json(request).await
    }

    /// Download a remote file's contents.
    pub async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        let request = self
            .request(Method::GET, &["files", "download"])?
            .query(&[("path", path)]);
        self.send_bytes(request).await
    }
}
