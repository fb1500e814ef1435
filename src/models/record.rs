//! Financial record as stored by the backend
//!
//! `amount` and `description` hold either plaintext or an encrypted field.
//! The `encrypted` flag is the authoritative signal for which one: it is
//! `Some(true)` exactly when both fields are ciphertext, and absent for
//! plaintext records. Plaintext records written before encryption was
//! enabled are never rewritten, so both shapes coexist indefinitely.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RecordId;
use super::money::Money;

/// The stored form of an amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// Plaintext amount, stored as a whole number of cents
    Plain(Money),
    /// Encrypted canonical decimal string
    Sealed(String),
}

impl Amount {
    /// The plaintext amount, if this is not ciphertext
    pub fn as_money(&self) -> Option<Money> {
        match self {
            Self::Plain(money) => Some(*money),
            Self::Sealed(_) => None,
        }
    }
}

impl From<Money> for Amount {
    fn from(money: Money) -> Self {
        Self::Plain(money)
    }
}

/// A financial transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier
    pub id: RecordId,

    /// Transaction date
    pub date: NaiveDate,

    /// Amount (positive for inflow, negative for outflow)
    pub amount: Amount,

    /// Payee or free-text description
    pub description: String,

    /// Category label (never encrypted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Present and true when `amount` and `description` are ciphertext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,

    /// Import ID for duplicate detection during CSV import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Create a new plaintext record
    pub fn new(date: NaiveDate, amount: Money, description: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            date,
            amount: Amount::Plain(amount),
            description: description.into(),
            category: None,
            encrypted: None,
            import_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set the category label
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether the stored fields are ciphertext
    pub fn is_encrypted(&self) -> bool {
        self.encrypted == Some(true)
    }
}
