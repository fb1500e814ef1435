//! Local and backend persistence for ledgerlock
//!
//! - `settings`: the backend contract for per-user salt + verification token
//! - `key_store`: the persisted, wrapped derived key
//! - `credentials`: biometric credential ids
//!
//! All file-backed stores write atomically through `file_io`.

pub mod credentials;
pub mod file_io;
pub mod key_store;
pub mod settings;

pub use credentials::CredentialStore;
pub use file_io::{read_json, write_json_atomic};
pub use key_store::{FileKeyStore, KeyStore};
pub use settings::{FileSettingsBackend, SettingsBackend};
