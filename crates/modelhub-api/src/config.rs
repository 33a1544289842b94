//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::paths;

/// Default backend URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without the `/api` prefix.
    pub base_url: String,
    /// Bearer token. When `None` the token file in `data_dir` is used.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Directory holding the token file and the notification log.
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            data_dir: paths::default_data_dir(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("MODELHUB_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let token = std::env::var("MODELHUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let timeout = std::env::var("MODELHUB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let data_dir = std::env::var("MODELHUB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| paths::default_data_dir());

        Self {
            base_url,
            token,
            timeout,
            data_dir,
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .base_url("http://nas.local:8188")
            .token("abc")
            .timeout(Duration::from_secs(5))
            .data_dir("/tmp/modelhub")
            .build();
        assert_eq!(config.base_url, "http://nas.local:8188");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/modelhub"));
    }
}
