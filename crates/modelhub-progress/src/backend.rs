//! The backend operations the tracker depends on.

use async_trait::async_trait;
use modelhub_api::{
    Ack, ApiClient, ApiError, Bundle, DownloadStatusMap, InstalledBundle, Model,
    StopDownloadResponse,
};

/// Remote operations used to start, observe and stop jobs.
///
/// Implemented by [`ApiClient`]; tests substitute an in-memory fake.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    /// Start installing one profile of a bundle.
    async fn install_bundle(&self, bundle_id: &str, profile: &str) -> Result<(), ApiError>;

    /// Start downloading a model.
    async fn download_model(&self, model_id: &str) -> Result<(), ApiError>;

    /// Ask the backend to stop a download.
    async fn stop_download(&self, model_id: &str) -> Result<StopDownloadResponse, ApiError>;

    /// Current downloads keyed by model id.
    async fn download_status(&self) -> Result<DownloadStatusMap, ApiError>;

    /// Bundles reported as installed.
    async fn installed_bundles(&self) -> Result<Vec<InstalledBundle>, ApiError>;

    /// A bundle definition, used to tell which models an installation pulls.
    async fn bundle(&self, bundle_id: &str) -> Result<Bundle, ApiError>;

    /// Full model catalog, used for name resolution and install checks.
    async fn model_catalog(&self) -> Result<Vec<Model>, ApiError>;
}

fn accepted(ack: Ack) -> Result<(), ApiError> {
    if ack.success {
        Ok(())
    } else {
        Err(ApiError::Rejected(
            ack.message
                .unwrap_or_else(|| "backend reported failure".to_string()),
        ))
    }
}

#[async_trait]
impl ProgressBackend for ApiClient {
    async fn install_bundle(&self, bundle_id: &str, profile: &str) -> Result<(), ApiError> {
        accepted(ApiClient::install_bundle(self, bundle_id, profile).await?)
    }

    async fn download_model(&self, model_id: &str) -> Result<(), ApiError> {
        accepted(ApiClient::download_model(self, model_id).await?)
    }

    async fn stop_download(&self, model_id: &str) -> Result<StopDownloadResponse, ApiError> {
        ApiClient::stop_download(self, model_id).await
    }

    async fn download_status(&self) -> Result<DownloadStatusMap, ApiError> {
        ApiClient::download_status(self).await
    }

    async fn installed_bundles(&self) -> Result<Vec<InstalledBundle>, ApiError> {
        ApiClient::installed_bundles(self).await
    }

    async fn bundle(&self, bundle_id: &str) -> Result<Bundle, ApiError> {
        self.get_bundle(bundle_id).await
    }

    async fn model_catalog(&self) -> Result<Vec<Model>, ApiError> {
        self.list_models(None).await
    }
}
