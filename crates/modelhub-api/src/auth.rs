//! Bearer-token storage.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::Result;

/// Holds the bearer token in memory and mirrors it to a file.
///
/// An explicitly configured token (flag or `MODELHUB_TOKEN`) takes precedence
/// over the file but is still cleared from memory on a 401.
pub struct TokenStore {
    path: PathBuf,
    token: Mutex<Option<String>>,
}

impl TokenStore {
    /// Load the token from `path`, unless `override_token` is given.
    pub fn load(path: PathBuf, override_token: Option<String>) -> Self {
        let token = override_token.or_else(|| {
            fs::read_to_string(&path)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

        debug!("Token store at {:?} (token present: {})", path, token.is_some());

        Self {
            path,
            token: Mutex::new(token),
        }
    }

    /// Current token, if any.
    pub fn get(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a new token, persisting it to disk.
    pub fn set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        info!("Stored API token");
        Ok(())
    }

    /// Forget the token in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("Cleared stored API token");
        }
        Ok(())
    }
}
