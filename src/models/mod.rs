//! Data models for ledgerlock
//!
//! Identifiers, amounts, the stored record shape and the per-user
//! encryption settings document.

pub mod ids;
pub mod money;
pub mod record;
pub mod settings;

pub use ids::{RecordId, UserId};
pub use money::{Money, MoneyParseError};
pub use record::{Amount, Record};
pub use settings::EncryptionSettings;
