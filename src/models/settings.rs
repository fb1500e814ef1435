//! Server-held encryption settings
//!
//! One document per user. Holds only the salt, the KDF iteration count and
//! the verification token; never the key or the passphrase.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptedField, DEFAULT_ITERATIONS};
use crate::error::{LockError, LockResult};

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// Per-user encryption settings as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettings {
    /// Key derivation salt (base64 encoded)
    pub salt: String,

    /// Encryption of the fixed verification marker under the derived key
    pub verification_hash: EncryptedField,

    /// PBKDF2 iteration count the key was derived with
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl EncryptionSettings {
    /// Build settings from a raw salt and verification token
    pub fn new(salt: &[u8], verification_hash: EncryptedField, iterations: u32) -> Self {
        Self {
            salt: STANDARD.encode(salt),
            verification_hash,
            iterations,
        }
    }

    /// Decode the salt from base64
    pub fn salt_bytes(&self) -> LockResult<Vec<u8>> {
        STANDARD
            .decode(&self.salt)
            .map_err(|e| LockError::KeyDerivation(format!("Invalid salt encoding: {}", e)))
    }
}
