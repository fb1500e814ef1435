//! Key derivation using PBKDF2-HMAC-SHA256
//!
//! Derives the field-encryption key from a user passphrase and a per-user
//! salt. The iteration count is the brute-force throttle: 600,000 rounds by
//! default, which costs a few hundred milliseconds per setup or unlock.

use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{LockError, LockResult};

/// Size of a freshly generated salt in bytes
pub const SALT_LEN: usize = 16;

/// Size of the derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Recommended (and configured minimum) PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Largest iteration count accepted from stored settings
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// Iteration count used by unit tests so the suite stays fast
#[cfg(test)]
pub(crate) const TEST_ITERATIONS: u32 = 1_000;

/// Generate a random salt for a new enrolment
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// A derived encryption key
///
/// Not `Clone`, zeroized on drop, and the raw bytes are only reachable inside
/// the crate. Code outside ledgerlock holds it as an opaque handle.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Wrap raw key bytes (used when unwrapping a persisted key)
    pub(crate) fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Generate a random key that is not bound to any passphrase
    pub(crate) fn random() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

// Never print key material
impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive an encryption key from a passphrase
///
/// Deterministic: the same passphrase, salt and iteration count always yield
/// the same key. The engine imposes no minimum passphrase length; callers
/// validate that before deriving (see [`super::passphrase`]).
pub fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> LockResult<DerivedKey> {
    if salt.is_empty() {
        return Err(LockError::KeyDerivation("Salt must not be empty".to_string()));
    }
    if iterations == 0 {
        return Err(LockError::KeyDerivation(
            "Iteration count must be positive".to_string(),
        ));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut key);

    Ok(DerivedKey { key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_salt_is_random() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), SALT_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_iterations_meet_minimum() {
        assert!(DEFAULT_ITERATIONS >= 600_000);
    }

    #[test]
    fn test_same_passphrase_same_key() {
        let salt = generate_salt();
        let key1 = derive_key("test_passphrase", &salt, TEST_ITERATIONS).unwrap();
        let key2 = derive_key("test_passphrase", &salt, TEST_ITERATIONS).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_passphrase_different_key() {
        let salt = generate_salt();
        let key1 = derive_key("passphrase1", &salt, TEST_ITERATIONS).unwrap();
        let key2 = derive_key("passphrase2", &salt, TEST_ITERATIONS).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("same_passphrase", &generate_salt(), TEST_ITERATIONS).unwrap();
        let key2 = derive_key("same_passphrase", &generate_salt(), TEST_ITERATIONS).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_iterations_change_key() {
        let salt = generate_salt();
        let key1 = derive_key("passphrase", &salt, TEST_ITERATIONS).unwrap();
        let key2 = derive_key("passphrase", &salt, TEST_ITERATIONS + 1).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_known_vector() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256, c = 1, dkLen = 64 (first 32 bytes)
        let key = derive_key("passwd", b"salt", 1).unwrap();
        assert_eq!(
            key.as_bytes()[..8],
            [0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]
        );
    }

    #[test]
    fn test_rejects_empty_salt_and_zero_iterations() {
        assert!(matches!(
            derive_key("passphrase", &[], TEST_ITERATIONS),
            Err(LockError::KeyDerivation(_))
        ));
        assert!(matches!(
            derive_key("passphrase", &generate_salt(), 0),
            Err(LockError::KeyDerivation(_))
        ));
    }

    #[test]
    fn test_empty_passphrase_is_allowed_by_engine() {
        assert!(derive_key("", &generate_salt(), TEST_ITERATIONS).is_ok());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = derive_key("secret", &generate_salt(), TEST_ITERATIONS).unwrap();
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
