//! Security audit journal
//!
//! Records setup, unlock, lock, sign-out, passphrase changes and biometric
//! enrolment in an append-only JSONL file.
//!
//! - `AuditEntry` / `SecurityEvent`: what gets written
//! - `AuditLogger`: appends and reads the journal

mod entry;
mod logger;

pub use entry::{AuditEntry, SecurityEvent, UnlockMethod};
pub use logger::AuditLogger;
