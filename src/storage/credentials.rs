//! Biometric credential id storage
//!
//! Maps a user id to the base64 credential id of their platform credential.
//! The id is a public handle, not a secret; it is useless without the key
//! persisted in the key store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LockResult;
use crate::models::UserId;

use super::file_io::{read_json, write_json_atomic};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialData {
    #[serde(default)]
    credentials: BTreeMap<UserId, String>,
}

/// Simple key-value store of biometric credential ids
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Look up the credential id registered for a user
    pub fn get_credential_id(&self, user: &UserId) -> LockResult<Option<String>> {
        let data: CredentialData = read_json(&self.path)?;
        Ok(data.credentials.get(user).cloned())
    }

    /// Record the credential id for a user, replacing any previous one
    pub fn set_credential_id(&self, user: &UserId, credential_id: &str) -> LockResult<()> {
        let mut data: CredentialData = read_json(&self.path)?;
        data.credentials
            .insert(user.clone(), credential_id.to_string());
        write_json_atomic(&self.path, &data)
    }

    /// Forget the credential id for a user
    pub fn clear_credential_id(&self, user: &UserId) -> LockResult<()> {
        let mut data: CredentialData = read_json(&self.path)?;
        if data.credentials.remove(user).is_some() {
            write_json_atomic(&self.path, &data)?;
        }
        Ok(())
    }
}
