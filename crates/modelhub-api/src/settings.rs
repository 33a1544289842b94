//! Application settings endpoints.

use reqwest::Method;
use tracing::info;

use crate::client::ApiClient;
use crate::error::Result;
use crate::types::{Ack, BaseDirConfig, CredentialsChange};

impl ApiClient {
    /// Backend base directory.
    pub async fn base_dir(&self) -> Result<BaseDirConfig> {
        self.get_json(&["config", "base-dir"]).await
    }

    /// Change the backend base directory.
    pub async fn set_base_dir(&self, base_dir: &str) -> Result<BaseDirConfig> {
        info!("Setting base directory to '{}'", base_dir);
        let request = self
            .request(Method::PUT, &["config", "base-dir"])?
            .json(&BaseDirConfig {
                base_dir: base_dir.to_string(),
            });
        self.send_json(request).await
    }

    /// Change the login credentials.
    pub async fn change_credentials(&self, change: &CredentialsChange) -> Result<Ack> {
        info!("Changing credentials");
        let request = self
            .request(Method::POST, &["auth", "change-credentials"])?
            .json(change);
        self.send_json(request).await
    }
}
