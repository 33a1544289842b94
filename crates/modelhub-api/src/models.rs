//! Model catalog and download endpoints.

use reqwest::Method;
use tracing::info;

use crate::client::ApiClient;
use crate::error::Result;
use crate::types::{Ack, DownloadStatusMap, Model, StopDownloadResponse, TokenConfig};

impl ApiClient {
    /// List the model catalog, optionally filtered by a search term.
    pub async fn list_models(&self, search: Option<&str>) -> Result<Vec<Model>> {
        let mut request = self.request(Method::GET, &["models"])?;
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            request = request.query(&[("search", term)]);
        }
        self.send_json(request).await
    }

    /// Ask the backend to start downloading a model.
    pub async fn download_model(&self, model_id: &str) -> Result<Ack> {
        info!("Requesting download of model '{}'", model_id);
        let request = self.request(Method::POST, &["models", model_id, "download"])?;
        self.send_json(request).await
    }

    /// Delete an installed model.
    pub async fn delete_model(&self, model_id: &str) -> Result<Ack> {
        info!("Deleting model '{}'", model_id);
        let request = self.request(Method::DELETE, &["models", model_id])?;
        self.send_json(request).await
    }

    /// Ask the backend to stop an in-flight download.
    pub async fn stop_download(&self, model_id: &str) -> Result<StopDownloadResponse> {
        info!("Requesting stop of download '{}'", model_id);
        let request = self.request(Method::POST, &["models", model_id, "stop-download"])?;
        self.send_json(request).await
    }

    /// Current server-side downloads, keyed by model id.
    ///
    /// Entries that omit `model_id` get it filled in from their key.
    pub async fn download_status(&self) -> Result<DownloadStatusMap> {
        let mut map: DownloadStatusMap = self.get_json(&["models", "downloads"]).await?;
        for (key, status) in map.iter_mut() {
            if status.model_id.is_empty() {
                status.model_id = key.clone();
            }
        }
        Ok(map)
    }

    /// Read the third-party download token configuration.
    pub async fn token_config(&self) -> Result<TokenConfig> {
        self.get_json(&["models", "tokens"]).await
    }

    /// Update the third-party download token configuration.
    pub async fn set_token_config(&self, tokens: &TokenConfig) -> Result<Ack> {
        let request = self.request(Method::PUT, &["models", "tokens"])?.json(tokens);
        self.send_json(request).await
    }
}
