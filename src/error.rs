//! Custom error types for ledgerlock
//!
//! This module defines the error hierarchy for the encryption subsystem using
//! thiserror. Messages name *what* failed; they never carry passphrases, key
//! material or decrypted values.

use thiserror::Error;

/// The main error type for ledgerlock operations
#[derive(Error, Debug)]
pub enum LockError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// User input rejected before any cryptographic work
    #[error("Validation error: {0}")]
    Validation(String),

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption or authentication-tag failure
    #[error("Decryption failed")]
    Decryption,

    /// Key derivation errors
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Key store, credential store or settings file errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Setup was attempted for a user that already has encryption settings
    #[error("Encryption already configured")]
    AlreadyConfigured,

    /// An operation needed encryption settings that do not exist yet
    #[error("Encryption is not configured")]
    NotConfigured,

    /// Wrong passphrase, or stored settings that cannot verify it
    #[error("Incorrect passphrase")]
    IncorrectPassphrase,

    /// The operation requires an unlocked session
    #[error("Session is locked")]
    Locked,

    /// Platform authenticator errors surfaced during enrolment
    #[error("Biometric error: {0}")]
    Biometric(String),
}

impl LockError {
    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the user can fix this by changing what they typed
    ///
    /// Everything else is recovered locally or retried by resubmitting.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::IncorrectPassphrase | Self::AlreadyConfigured
        )
    }
}

impl From<std::io::Error> for LockError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledgerlock operations
pub type LockResult<T> = Result<T, LockError>;
