//! Path management for ledgerlock
//!
//! ## Path Resolution Order
//!
//! 1. `LEDGERLOCK_DATA_DIR` environment variable (if set)
//! 2. The platform data directory (`~/.local/share/ledgerlock`,
//!    `~/Library/Application Support/ledgerlock`, `%APPDATA%\ledgerlock\data`)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::LockError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "LEDGERLOCK_DATA_DIR";

/// Manages all local paths used by ledgerlock
#[derive(Debug, Clone)]
pub struct LockPaths {
    base_dir: PathBuf,
}

impl LockPaths {
    /// Resolve the base directory from the environment or platform defaults
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, LockError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) => PathBuf::from(custom),
            None => ProjectDirs::from("", "", "ledgerlock")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    LockError::Config("Could not determine a data directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Create LockPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Session configuration file
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Per-user encryption settings (file-backed settings backend)
    pub fn encryption_settings_file(&self) -> PathBuf {
        self.base_dir.join("encryption_settings.json")
    }

    /// Wrapped per-user keys
    pub fn key_store_file(&self) -> PathBuf {
        self.base_dir.join("keys.json")
    }

    /// Device-local wrapping key protecting `keys.json`
    pub fn device_key_file(&self) -> PathBuf {
        self.base_dir.join("device.key")
    }

    /// Biometric credential ids
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join("credentials.json")
    }

    /// Security audit journal
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), LockError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LockError::Io(format!("Failed to create base directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LockPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.key_store_file(), temp_dir.path().join("keys.json"));
        assert_eq!(paths.device_key_file(), temp_dir.path().join("device.key"));
        assert_eq!(paths.credentials_file(), temp_dir.path().join("credentials.json"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var(DATA_DIR_ENV, temp_dir.path());

        let paths = LockPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());

        std::env::remove_var(DATA_DIR_ENV);
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LockPaths::with_base_dir(temp_dir.path().join("nested").join("base"));

        paths.ensure_directories().unwrap();
        assert!(paths.base_dir().exists());
    }
}
