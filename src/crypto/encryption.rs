//! AES-256-GCM field encryption
//!
//! Every encryption draws a fresh 96-bit nonce and produces a self-describing
//! string `base64(nonce || ciphertext || tag)`. Decryption fails closed: the
//! GCM tag is the sole integrity check and a mismatch is always an error.

use std::fmt;

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{LockError, LockResult};

use super::DerivedKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Publicly known plaintext sealed into the verification token
const VERIFICATION_MARKER: &str = "ledgerlock_verify";

/// An encrypted field value: `base64(nonce || ciphertext)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    /// Accept a string as an encrypted field if it is at least shaped like one
    ///
    /// This only checks the encoding and minimum length; whether it actually
    /// decrypts is decided by [`decrypt`].
    pub fn parse(encoded: &str) -> LockResult<Self> {
        let raw = STANDARD.decode(encoded).map_err(|_| LockError::Decryption)?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(LockError::Decryption);
        }
        Ok(Self(encoded.to_string()))
    }

    /// Get the encoded string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the encoded string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncryptedField {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn cipher_for(key: &DerivedKey) -> LockResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LockError::Encryption(format!("Failed to create cipher: {}", e)))
}

/// Seal raw bytes, returning `nonce || ciphertext || tag`
///
/// `aad` is authenticated but not encrypted; [`open`] must be given the same
/// bytes. Field encryption passes an empty slice.
pub(crate) fn seal(plaintext: &[u8], aad: &[u8], key: &DerivedKey) -> LockResult<Vec<u8>> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| LockError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open bytes produced by [`seal`]
pub(crate) fn open(sealed: &[u8], aad: &[u8], key: &DerivedKey) -> LockResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(LockError::Decryption);
    }

    let cipher = cipher_for(key)?;
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| LockError::Decryption)
}

/// Encrypt a string field
///
/// Probabilistic: encrypting the same plaintext twice yields different output.
pub fn encrypt(plaintext: &str, key: &DerivedKey) -> LockResult<EncryptedField> {
    let sealed = seal(plaintext.as_bytes(), &[], key)?;
    Ok(EncryptedField(STANDARD.encode(sealed)))
}

/// Decrypt a string field
///
/// Fails on bad base64, short input, a wrong key, any tampering, or
/// non-UTF-8 plaintext. Never returns partial output.
pub fn decrypt(encoded: &str, key: &DerivedKey) -> LockResult<String> {
    let sealed = STANDARD.decode(encoded).map_err(|_| LockError::Decryption)?;
    let plaintext = open(&sealed, &[], key)?;
    String::from_utf8(plaintext).map_err(|_| LockError::Decryption)
}

/// Create the verification token for a key
pub fn create_verification_hash(key: &DerivedKey) -> LockResult<EncryptedField> {
    encrypt(VERIFICATION_MARKER, key)
}

/// Check a candidate key against a stored verification token
///
/// Decryption errors mean "wrong passphrase" and are reported as `false`.
pub fn verify_passphrase(key: &DerivedKey, verification_hash: &str) -> bool {
    matches!(decrypt(verification_hash, key), Ok(marker) if marker == VERIFICATION_MARKER)
}
