//! Session configuration
//!
//! Tunables for the encryption session: inactivity timeout, passphrase
//! policy, key-stretching cost, import chunking and audit journaling.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::LockPaths;
use crate::crypto::{DEFAULT_ITERATIONS, MAX_ITERATIONS, MIN_PASSPHRASE_LEN};
use crate::error::LockError;

/// Largest batch the backend accepts in one write
pub const MAX_IMPORT_CHUNK: usize = 100;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Seconds without input activity before the session locks
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Minimum length for new passphrases
    #[serde(default = "default_min_passphrase_len")]
    pub min_passphrase_len: usize,

    /// PBKDF2 iterations for newly derived keys
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Records per backend write during CSV import
    #[serde(default = "default_import_chunk_size")]
    pub import_chunk_size: usize,

    /// Whether security events are appended to the audit journal
    #[serde(default = "default_audit_log")]
    pub audit_log: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_min_passphrase_len() -> usize {
    MIN_PASSPHRASE_LEN
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_import_chunk_size() -> usize {
    MAX_IMPORT_CHUNK
}

fn default_audit_log() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            idle_timeout_secs: default_idle_timeout_secs(),
            min_passphrase_len: default_min_passphrase_len(),
            kdf_iterations: default_kdf_iterations(),
            import_chunk_size: default_import_chunk_size(),
            audit_log: default_audit_log(),
        }
    }
}

impl SessionConfig {
    /// Inactivity timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Reject values that weaken the security floor or break the backend contract
    pub fn validate(&self) -> Result<(), LockError> {
        if self.kdf_iterations < DEFAULT_ITERATIONS || self.kdf_iterations > MAX_ITERATIONS {
            return Err(LockError::Config(format!(
                "kdf_iterations must be between {} and {}",
                DEFAULT_ITERATIONS, MAX_ITERATIONS
            )));
        }
        if self.min_passphrase_len < MIN_PASSPHRASE_LEN {
            return Err(LockError::Config(format!(
                "min_passphrase_len must be at least {}",
                MIN_PASSPHRASE_LEN
            )));
        }
        if self.import_chunk_size == 0 || self.import_chunk_size > MAX_IMPORT_CHUNK {
            return Err(LockError::Config(format!(
                "import_chunk_size must be between 1 and {}",
                MAX_IMPORT_CHUNK
            )));
        }
        if self.idle_timeout_secs == 0 {
            return Err(LockError::Config(
                "idle_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from disk, or defaults if the file doesn't exist
    pub fn load_or_create(paths: &LockPaths) -> Result<Self, LockError> {
        let config_path = paths.config_file();

        let config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .map_err(|e| LockError::Io(format!("Failed to read config file: {}", e)))?;

            serde_json::from_str::<SessionConfig>(&contents)
                .map_err(|e| LockError::Config(format!("Failed to parse config file: {}", e)))?
        } else {
            SessionConfig::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, paths: &LockPaths) -> Result<(), LockError> {
        self.validate()?;
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LockError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(paths.config_file(), contents)
            .map_err(|e| LockError::Io(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Fast configuration for unit tests: cheap key stretching, same policy otherwise
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            kdf_iterations: crate::crypto::key_derivation::TEST_ITERATIONS,
            audit_log: false,
            ..Self::default()
        }
    }
}
