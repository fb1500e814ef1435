//! Cryptographic functions for ledgerlock
//!
//! Provides AES-256-GCM field encryption with PBKDF2-HMAC-SHA256 key
//! derivation. Everything here is stateless.

pub mod encryption;
pub mod key_derivation;
pub mod passphrase;

pub use encryption::{
    create_verification_hash, decrypt, encrypt, verify_passphrase, EncryptedField,
};
pub use key_derivation::{derive_key, generate_salt, DerivedKey, DEFAULT_ITERATIONS, MAX_ITERATIONS};
pub use passphrase::{validate_new_passphrase, Passphrase, MIN_PASSPHRASE_LEN};
