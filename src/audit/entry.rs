//! Audit entry data structures
//!
//! Security events recorded by the session controller. Entries carry the
//! user id and an optional short detail string; never passphrases, keys or
//! decrypted values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// How a session came to be unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMethod {
    /// Passphrase typed and verified
    Passphrase,
    /// Biometric assertion released the persisted key
    Biometric,
    /// Persisted key loaded on startup
    Restored,
}

impl std::fmt::Display for UnlockMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnlockMethod::Passphrase => write!(f, "passphrase"),
            UnlockMethod::Biometric => write!(f, "biometric"),
            UnlockMethod::Restored => write!(f, "restored"),
        }
    }
}

/// Security-relevant session events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "method", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// Encryption was configured for the first time
    Setup,
    /// The session was unlocked
    Unlock(UnlockMethod),
    /// A passphrase or biometric unlock attempt was rejected
    FailedUnlock(UnlockMethod),
    /// The inactivity timer locked the session
    IdleLock,
    /// The session was locked explicitly
    Lock,
    /// The user signed out
    SignOut,
    /// The passphrase was replaced
    PassphraseChange,
    /// A biometric credential was registered
    BiometricEnrolled,
    /// The biometric credential was removed
    BiometricRemoved,
}

impl std::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityEvent::Setup => write!(f, "SETUP"),
            SecurityEvent::Unlock(method) => write!(f, "UNLOCK ({})", method),
            SecurityEvent::FailedUnlock(method) => write!(f, "FAILED UNLOCK ({})", method),
            SecurityEvent::IdleLock => write!(f, "IDLE LOCK"),
            SecurityEvent::Lock => write!(f, "LOCK"),
            SecurityEvent::SignOut => write!(f, "SIGN OUT"),
            SecurityEvent::PassphraseChange => write!(f, "PASSPHRASE CHANGE"),
            SecurityEvent::BiometricEnrolled => write!(f, "BIOMETRIC ENROLLED"),
            SecurityEvent::BiometricRemoved => write!(f, "BIOMETRIC REMOVED"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the event occurred (UTC)
    pub timestamp: DateTime<Utc>,

    /// User the event concerns
    pub user_id: UserId,

    /// What happened
    pub event: SecurityEvent,

    /// Short non-sensitive detail (e.g. number of re-keyed records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time
    pub fn new(user_id: &UserId, event: SecurityEvent) -> Self {
        Self::at(Utc::now(), user_id, event)
    }

    /// Create an entry with an explicit timestamp
    pub fn at(timestamp: DateTime<Utc>, user_id: &UserId, event: SecurityEvent) -> Self {
        Self {
            timestamp,
            user_id: user_id.clone(),
            event,
            detail: None,
        }
    }

    /// Attach a detail string
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.event,
            self.user_id
        );

        if let Some(detail) = &self.detail {
            output.push_str(&format!(" ({})", detail));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        assert_eq!(SecurityEvent::Setup.to_string(), "SETUP");
        assert_eq!(
            SecurityEvent::Unlock(UnlockMethod::Biometric).to_string(),
            "UNLOCK (biometric)"
        );
        assert_eq!(SecurityEvent::IdleLock.to_string(), "IDLE LOCK");
    }

    #[test]
    fn test_serialization() {
        let entry = AuditEntry::new(
            &UserId::new("alice"),
            SecurityEvent::FailedUnlock(UnlockMethod::Passphrase),
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["kind"], "failed_unlock");
        assert_eq!(json["event"]["method"], "passphrase");
        assert!(json.get("detail").is_none());

        let back: AuditEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.event, entry.event);
    }

    #[test]
    fn test_unit_event_serialization() {
        let entry = AuditEntry::new(&UserId::new("alice"), SecurityEvent::SignOut);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["kind"], "sign_out");
    }

    #[test]
    fn test_human_readable_format() {
        let entry = AuditEntry::new(&UserId::new("alice"), SecurityEvent::PassphraseChange)
            .with_detail("12 records re-keyed");

        let formatted = entry.format_human_readable();
        assert!(formatted.contains("PASSPHRASE CHANGE"));
        assert!(formatted.contains("alice"));
        assert!(formatted.contains("12 records re-keyed"));
    }
}
