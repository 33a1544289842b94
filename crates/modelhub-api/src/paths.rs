//! Path utilities for the modelhub data directory.

use std::path::{Path, PathBuf};

/// Get the default data directory (~/.modelhub/).
///
/// Falls back to `./.modelhub` when no home directory can be determined.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".modelhub")
}

/// Path to the stored bearer token inside a data directory.
pub fn token_path(data_dir: &Path) -> PathBuf {
    data_dir.join("token")
}

/// Path to the persisted notification log inside a data directory.
pub fn notifications_path(data_dir: &Path) -> PathBuf {
    data_dir.join("notifications.json")
}

/// Ensure the data directory exists.
pub fn ensure_data_dir(data_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_data_dir() {
        let dir = PathBuf::from("/tmp/mh");
        assert_eq!(token_path(&dir), PathBuf::from("/tmp/mh/token"));
        assert_eq!(
            notifications_path(&dir),
            PathBuf::from("/tmp/mh/notifications.json")
        );
    }

    #[test]
    fn test_default_data_dir_name() {
        assert!(default_data_dir().ends_with(".modelhub"));
    }
}
