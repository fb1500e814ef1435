//! ledgerlock - client-side field encryption for personal finance records
//!
//! Turns a user passphrase into an AES-256 key, encrypts record fields
//! before they reach the storage backend, keeps the unlocked key across
//! restarts without keeping the passphrase, locks after inactivity, and
//! offers biometric re-unlock of the same key.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `crypto`: key derivation, AES-256-GCM field encryption, passphrases
//! - `storage`: settings backend, wrapped key store, biometric credential ids
//! - `biometric`: platform authenticator seam and the biometric gate
//! - `session`: the per-user session controller and inactivity timer
//! - `services`: record codec and CSV import
//! - `models`: identifiers, money, records, encryption settings
//! - `audit`: security event journal
//! - `config`: paths and session configuration
//! - `error`: custom error types
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerlock::biometric::NoPlatformAuthenticator;
//! use ledgerlock::config::{LockPaths, SessionConfig};
//! use ledgerlock::crypto::Passphrase;
//! use ledgerlock::session::SessionController;
//!
//! let paths = LockPaths::new()?;
//! let config = SessionConfig::load_or_create(&paths)?;
//! let mut session =
//!     SessionController::from_paths(user_id, &paths, config, NoPlatformAuthenticator)?;
//! session.initialize()?;
//! session.unlock_with_passphrase(&Passphrase::new(typed))?;
//! let stored = session.encrypt_value("42.50");
//! ```

pub mod audit;
pub mod biometric;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

pub use error::{LockError, LockResult};
pub use session::{SessionController, SessionState};

#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
