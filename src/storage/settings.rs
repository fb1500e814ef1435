//! Encryption settings backend
//!
//! The backend is the only place the salt and verification token live. The
//! real deployment talks to a document store; `FileSettingsBackend` keeps the
//! same contract in a local JSON file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LockError, LockResult};
use crate::models::{EncryptionSettings, UserId};

use super::file_io::{read_json, write_json_atomic};

/// Backend contract for per-user encryption settings
pub trait SettingsBackend {
    /// Fetch settings for a user; `None` until setup has run
    fn get_encryption_settings(&self, user: &UserId) -> LockResult<Option<EncryptionSettings>>;

    /// Store settings for the first time
    ///
    /// Fails with [`LockError::AlreadyConfigured`] if settings already exist.
    fn setup_encryption(&self, user: &UserId, settings: &EncryptionSettings) -> LockResult<()>;

    /// Atomically replace existing settings (passphrase change)
    ///
    /// Fails with [`LockError::NotConfigured`] if there is nothing to replace.
    fn replace_encryption(&self, user: &UserId, settings: &EncryptionSettings) -> LockResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsData {
    #[serde(default)]
    users: BTreeMap<UserId, EncryptionSettings>,
}

/// File-backed settings backend
pub struct FileSettingsBackend {
    path: PathBuf,
}

impl FileSettingsBackend {
    /// Create a backend storing settings in `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> LockResult<SettingsData> {
        read_json(&self.path)
    }
}

impl SettingsBackend for FileSettingsBackend {
    fn get_encryption_settings(&self, user: &UserId) -> LockResult<Option<EncryptionSettings>> {
        Ok(self.load()?.users.remove(user))
    }

    fn setup_encryption(&self, user: &UserId, settings: &EncryptionSettings) -> LockResult<()> {
        let mut data = self.load()?;
        if data.users.contains_key(user) {
            return Err(LockError::AlreadyConfigured);
        }
        data.users.insert(user.clone(), settings.clone());
        write_json_atomic(&self.path, &data)
    }

    fn replace_encryption(&self, user: &UserId, settings: &EncryptionSettings) -> LockResult<()> {
        let mut data = self.load()?;
        match data.users.get_mut(user) {
            Some(existing) => *existing = settings.clone(),
            None => return Err(LockError::NotConfigured),
        }
        write_json_atomic(&self.path, &data)
    }
}
