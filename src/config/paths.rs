//! Path resolution for sace-queue configuration and data files.
//!
//! All data is stored in `~/.sace-queue/` unless overridden:
//! - `config.yaml` - Main configuration file
//! - `queue.db` - SQLite key-value store holding the offline queue

use std::path::PathBuf;

use crate::error::QueueError;

/// Paths to sace-queue configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.sace-queue/`
    pub root: PathBuf,
    /// Config file: `~/.sace-queue/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.sace-queue/queue.db`
    pub database: PathBuf,
}

impl Paths {
    /// Create paths based on the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, QueueError> {
        let home = std::env::var("HOME")
            .map_err(|_| QueueError::Config("Could not determine home directory".to_string()))?;

        Ok(Self::with_root(PathBuf::from(home).join(".sace-queue")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("queue.db"),
            root,
        }
    }

    /// Ensure the root directory exists, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), QueueError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                QueueError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_with_root() {
        let root = PathBuf::from("/tmp/test-sace-queue");
        let paths = Paths::with_root(root.clone());

        assert_eq!(paths.root, root);
        assert_eq!(paths.config_file, root.join("config.yaml"));
        assert_eq!(paths.database, root.join("queue.db"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::with_root(temp_dir.path().join("data"));

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(paths.root.exists());
    }
}
