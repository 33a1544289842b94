//! HTTP client core: URL building, bearer auth and response handling.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::paths;

/// Client for the modelhub backend REST API.
///
/// Endpoint groups live in their own modules (`models`, `bundles`,
/// `workflows`, `files`, `settings`) as further `impl ApiClient` blocks.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<TokenStore>,
}

/// Error body shapes the backend is known to produce.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Detail>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    msg: String,
}

impl ApiClient {
    /// Create a new client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("modelhub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = TokenStore::load(paths::token_path(&config.data_dir), config.token);

        Ok(Self {
            client,
            base_url,
            tokens: Arc::new(tokens),
        })
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// The token store backing the `Authorization` header.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Build `<base>/api/<segments...>`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Start a request, attaching the bearer token when one is stored.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!("HTTP {} {}", method, url);

        let mut builder = self.client.request(method, url);
        if let Some(token) = self.tokens.get() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send a request and turn non-success responses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ApiError::Unreachable(self.base_url.to_string())
            } else {
                ApiError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected the API token; clearing it");
            if let Err(e) = self.tokens.clear() {
                warn!("Failed to clear stored token: {}", e);
            }
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    /// Send a request and decode the JSON body.
    ///
    /// An empty body decodes as `{}` so acknowledgements without content work.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request and return the raw body.
    pub(crate) async fn send_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET a JSON resource.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let request = self.request(Method::GET, segments)?;
        self.send_json(request).await
    }
}

/// Extract the most useful message from an error response body.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let detail = match parsed.detail {
            Some(Detail::Text(text)) => Some(text),
            Some(Detail::Items(items)) if !items.is_empty() => Some(
                items
                    .into_iter()
                    .map(|i| i.msg)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        };
        if let Some(message) = detail.or(parsed.message).or(parsed.error) {
            return message;
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}
