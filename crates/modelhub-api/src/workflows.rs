//! Workflow endpoints.

use std::path::Path;

use reqwest::multipart::Form;
use reqwest::Method;

use crate::bundles::file_part;
use crate::client::ApiClient;
use crate::error::Result;
use crate::types::Workflow;

impl ApiClient {
    /// List workflows known to the backend.
    pub async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        self.get_json(&["workflows"]).await
    }

    /// Upload a workflow file.
    pub async fn upload_workflow(&self, file: &Path) -> Result<Workflow> {
        let form = Form::new().part("file", file_part(file).await?);
        let request = self
            .request(Method::POST, &["workflows", "upload"])?
            .multipart(form);
        self.send_json(request).await
    }
}
