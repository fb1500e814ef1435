//! Key persistence store
//!
//! Keeps the unlocked key across restarts so the passphrase need not be
//! re-entered. Raw key bytes never touch disk: each key is sealed with
//! AES-256-GCM under a random device wrapping key held in a separate
//! owner-only file, with the user id bound in as associated data so wrapped
//! keys cannot be moved between users.

use std::collections::BTreeMap;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::LockPaths;
use crate::crypto::encryption::{open, seal};
use crate::crypto::key_derivation::KEY_LEN;
use crate::crypto::DerivedKey;
use crate::error::{LockError, LockResult};
use crate::models::UserId;

use super::file_io::{read_json, write_json_atomic};

/// Durable per-user storage of the derived key
///
/// One entry per user; `save_key` overwrites. Concurrent writers for the
/// same user are last-write-wins.
pub trait KeyStore {
    /// Persist the key for a user
    fn save_key(&self, user: &UserId, key: &DerivedKey) -> LockResult<()>;

    /// Load the persisted key, if any
    fn load_key(&self, user: &UserId) -> LockResult<Option<DerivedKey>>;

    /// Remove the persisted key, if any
    fn clear_key(&self, user: &UserId) -> LockResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyData {
    /// user id -> base64(nonce || wrapped key || tag)
    #[serde(default)]
    keys: BTreeMap<UserId, String>,
}

#[derive(Default, Serialize, Deserialize)]
struct DeviceKeyFile {
    #[serde(default)]
    key: String,
}

/// File-backed key store with a device-local wrapping key
pub struct FileKeyStore {
    keys_path: PathBuf,
    device_key_path: PathBuf,
}

impl FileKeyStore {
    /// Create a key store under the standard paths
    pub fn new(paths: &LockPaths) -> Self {
        Self::with_files(paths.key_store_file(), paths.device_key_file())
    }

    /// Create a key store with explicit file locations
    pub fn with_files(keys_path: PathBuf, device_key_path: PathBuf) -> Self {
        Self {
            keys_path,
            device_key_path,
        }
    }

    fn read_device_key(&self) -> LockResult<Option<DerivedKey>> {
        let file: DeviceKeyFile = read_json(&self.device_key_path)?;
        if file.key.is_empty() {
            return Ok(None);
        }

        let raw = Zeroizing::new(
            STANDARD
                .decode(file.key.as_bytes())
                .map_err(|_| LockError::Storage("Device key is corrupt".to_string()))?,
        );
        let bytes: [u8; KEY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| LockError::Storage("Device key has the wrong length".to_string()))?;

        Ok(Some(DerivedKey::from_bytes(bytes)))
    }

    fn device_key_or_create(&self) -> LockResult<DerivedKey> {
        if let Some(key) = self.read_device_key()? {
            return Ok(key);
        }

        debug!(path = %self.device_key_path.display(), "creating device wrapping key");
        let key = DerivedKey::random();
        let file = DeviceKeyFile {
            key: STANDARD.encode(key.as_bytes()),
        };
        write_json_atomic(&self.device_key_path, &file)?;
        Ok(key)
    }
}

impl KeyStore for FileKeyStore {
    fn save_key(&self, user: &UserId, key: &DerivedKey) -> LockResult<()> {
        let device_key = self.device_key_or_create()?;
        let wrapped = seal(key.as_bytes(), user.as_str().as_bytes(), &device_key)?;

        let mut data: KeyData = read_json(&self.keys_path)?;
        data.keys.insert(user.clone(), STANDARD.encode(wrapped));
        write_json_atomic(&self.keys_path, &data)
    }

    fn load_key(&self, user: &UserId) -> LockResult<Option<DerivedKey>> {
        let data: KeyData = read_json(&self.keys_path)?;
        let Some(encoded) = data.keys.get(user) else {
            return Ok(None);
        };

        let Some(device_key) = self.read_device_key()? else {
            return Err(LockError::Storage(
                "Persisted key exists but the device key is missing".to_string(),
            ));
        };

        let wrapped = STANDARD
            .decode(encoded)
            .map_err(|_| LockError::Storage("Persisted key is corrupt".to_string()))?;
        let raw = Zeroizing::new(
            open(&wrapped, user.as_str().as_bytes(), &device_key)
                .map_err(|_| LockError::Storage("Persisted key could not be unwrapped".to_string()))?,
        );
        let bytes: [u8; KEY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| LockError::Storage("Persisted key has the wrong length".to_string()))?;

        Ok(Some(DerivedKey::from_bytes(bytes)))
    }

    fn clear_key(&self, user: &UserId) -> LockResult<()> {
        let mut data: KeyData = read_json(&self.keys_path)?;
        if data.keys.remove(user).is_some() {
            write_json_atomic(&self.keys_path, &data)?;
        }
        Ok(())
    }
}
