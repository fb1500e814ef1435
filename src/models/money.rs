//! Money type for transaction amounts
//!
//! Stores amounts as integer cents. The canonical decimal form produced by
//! [`Money::to_decimal_string`] (e.g. `"42.50"`) is what gets encrypted when
//! an amount is written as an encrypted field, and what is parsed back on
//! decryption.

use std::fmt;
use std::ops::{Add, Neg};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Largest float magnitude that converts to cents without losing precision
const MAX_EXACT_FLOAT_CENTS: f64 = 9_007_199_254_740_992.0;

/// A monetary amount stored as cents
///
/// Serialized as an integer number of cents. Deserialization also accepts a
/// float with no fractional part (`-1999.0`), as written by some encoders;
/// a fractional number is rejected rather than rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCents {
    Whole(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match StoredCents::deserialize(deserializer)? {
            StoredCents::Whole(cents) => Ok(Self(cents)),
            StoredCents::Float(cents)
                if cents.fract() == 0.0 && cents.abs() <= MAX_EXACT_FLOAT_CENTS =>
            {
                Ok(Self(cents as i64))
            }
            StoredCents::Float(cents) => Err(de::Error::custom(format!(
                "amount {} is not a whole number of cents",
                cents
            ))),
        }
    }
}

impl Money {
    /// Create a Money amount from cents
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Get the absolute value
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Canonical decimal form without a currency symbol: `"42.50"`, `"-0.05"`
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }

    /// Parse a money amount from a string
    ///
    /// Accepts `"10.50"`, `"-10.50"`, `"$10.50"`, `"(10.50)"`, `"1,250.00"`
    /// and whole numbers (`"10"` means ten units, not ten cents).
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let original = s;
        let s = s.trim();

        // Accounting-style negatives: (10.50)
        let (paren_negative, s) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            Some(inner) => (true, inner.trim()),
            None => (false, s),
        };

        let (negative, s) = match s.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, s),
        };
        if paren_negative && negative {
            return Err(MoneyParseError::InvalidFormat(original.to_string()));
        }

        let s = s.strip_prefix('$').unwrap_or(s);
        let digits: String = s.chars().filter(|c| *c != ',').collect();
        if digits.is_empty() {
            return Err(MoneyParseError::InvalidFormat(original.to_string()));
        }

        let invalid = || MoneyParseError::InvalidFormat(original.to_string());
        // Only one sign, and it has already been taken off
        if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(invalid());
        }

        let cents = match digits.split_once('.') {
            Some((whole, frac)) => {
                let whole: i64 = if whole.is_empty() {
                    0
                } else {
                    whole.parse().map_err(|_| invalid())?
                };
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                // Pad or truncate to two digits
                let frac: i64 = match frac.len() {
                    0 => 0,
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    _ => frac[..2].parse().map_err(|_| invalid())?,
                };
                whole
                    .checked_mul(100)
                    .and_then(|w| w.checked_add(frac))
                    .ok_or_else(invalid)?
            }
            None => digits
                .parse::<i64>()
                .map_err(|_| invalid())?
                .checked_mul(100)
                .ok_or_else(invalid)?,
        };

        Ok(Self(if negative ^ paren_negative { -cents } else { cents }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        if self.is_negative() {
            write!(f, "-${}.{:02}", abs / 100, abs % 100)
        } else {
            write!(f, "${}.{:02}", abs / 100, abs % 100)
        }
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("Invalid money format: {0}")]
    InvalidFormat(String),
}
