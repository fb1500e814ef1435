//! Passphrase handling
//!
//! Passphrases are held in a type that zeroizes its buffer on drop and never
//! prints its contents. Validation of new passphrases (minimum length and
//! confirmation) happens here, before any key derivation runs.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{LockError, LockResult};

/// Minimum passphrase length, in characters
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// A user passphrase that is wiped from memory on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Passphrase {
    inner: String,
}

impl Passphrase {
    /// Create a new Passphrase
    pub fn new(s: impl Into<String>) -> Self {
        Self { inner: s.into() }
    }

    /// Get the passphrase contents
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.inner.chars().count()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passphrase")
            .field("len", &self.char_len())
            .finish()
    }
}

impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED {} chars]", self.char_len())
    }
}

/// Validate a newly chosen passphrase and its confirmation
pub fn validate_new_passphrase(
    passphrase: &Passphrase,
    confirmation: &Passphrase,
    min_len: usize,
) -> LockResult<()> {
    if passphrase.char_len() < min_len {
        return Err(LockError::Validation(format!(
            "Passphrase must be at least {} characters",
            min_len
        )));
    }

    if passphrase.as_str() != confirmation.as_str() {
        return Err(LockError::Validation(
            "Passphrases do not match".to_string(),
        ));
    }

    Ok(())
}
