//! Record codec
//!
//! Applies field encryption to the `amount` and `description` of records on
//! their way to and from the backend. The `encrypted` flag decides whether a
//! stored record is decrypted at all, so legacy plaintext records are never
//! fed to the cipher. Both fields change together or not at all.

use tracing::debug;

use crate::biometric::PlatformAuthenticator;
use crate::crypto::EncryptedField;
use crate::error::{LockError, LockResult};
use crate::models::{Amount, Money, Record};
use crate::session::SessionController;
use crate::storage::{KeyStore, SettingsBackend};

/// Field-level cipher backed by a session key
///
/// Both methods return `None` when no key is available.
pub trait FieldCipher {
    fn try_encrypt(&self, plaintext: &str) -> Option<LockResult<EncryptedField>>;
    fn try_decrypt(&self, ciphertext: &str) -> Option<LockResult<String>>;
}

impl<B, K, A> FieldCipher for SessionController<B, K, A>
where
    B: SettingsBackend,
    K: KeyStore,
    A: PlatformAuthenticator,
{
    fn try_encrypt(&self, plaintext: &str) -> Option<LockResult<EncryptedField>> {
        SessionController::try_encrypt(self, plaintext)
    }

    fn try_decrypt(&self, ciphertext: &str) -> Option<LockResult<String>> {
        SessionController::try_decrypt(self, ciphertext)
    }
}

/// Encodes records for storage and decodes them for display
pub struct RecordCodec<'a, C: FieldCipher> {
    cipher: &'a C,
}

impl<'a, C: FieldCipher> RecordCodec<'a, C> {
    /// Create a codec over a cipher (normally the session controller)
    pub fn new(cipher: &'a C) -> Self {
        Self { cipher }
    }

    /// Prepare a record for the backend
    ///
    /// While unlocked, seals the amount (as its canonical decimal string)
    /// and the description and sets `encrypted`. While locked the record is
    /// stored as plaintext. Already-encrypted records are returned as-is.
    pub fn encode(&self, mut record: Record) -> LockResult<Record> {
        if record.is_encrypted() {
            return Ok(record);
        }

        let amount = match &record.amount {
            Amount::Plain(amount) => *amount,
            Amount::Sealed(_) => {
                return Err(LockError::Validation(
                    "Unflagged record has a non-numeric amount".to_string(),
                ))
            }
        };

        let Some(sealed_amount) = self.cipher.try_encrypt(&amount.to_decimal_string()) else {
            return Ok(record);
        };
        let sealed_amount = sealed_amount?;
        let sealed_description = self
            .cipher
            .try_encrypt(&record.description)
            .ok_or(LockError::Locked)??;

        record.amount = Amount::Sealed(sealed_amount.into_string());
        record.description = sealed_description.into_string();
        record.encrypted = Some(true);
        Ok(record)
    }

    /// Turn a stored record into its plaintext form if possible
    ///
    /// Unflagged records pass through untouched. Flagged records are opened
    /// when the session holds the right key; otherwise they come back still
    /// sealed so the caller can show them as ciphertext.
    pub fn decode(&self, record: Record) -> Record {
        if !record.is_encrypted() {
            return record;
        }

        match self.open_fields(&record) {
            Some((amount, description)) => Record {
                amount: Amount::Plain(amount),
                description,
                encrypted: None,
                ..record
            },
            None => record,
        }
    }

    /// Decode a batch of stored records
    pub fn decode_all(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().map(|record| self.decode(record)).collect()
    }

    fn open_fields(&self, record: &Record) -> Option<(Money, String)> {
        let Amount::Sealed(sealed_amount) = &record.amount else {
            debug!(record = %record.id, "flagged record has a plaintext amount");
            return None;
        };

        let amount = self.cipher.try_decrypt(sealed_amount)?.ok()?;
        let description = self.cipher.try_decrypt(&record.description)?.ok()?;

        match Money::parse(&amount) {
            Ok(money) => Some((money, description)),
            Err(_) => {
                debug!(record = %record.id, "decrypted amount is not a number");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::KeyCipher;
    use super::*;
    use crate::biometric::{BiometricGate, NoPlatformAuthenticator};
    use crate::config::{LockPaths, SessionConfig};
    use crate::crypto::{decrypt, Passphrase};
    use crate::models::UserId;
    use crate::storage::{CredentialStore, FileKeyStore, FileSettingsBackend};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(cents: i64, description: &str) -> Record {
        Record::new(
            NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
            Money::from_cents(cents),
            description,
        )
        .with_category("Food")
    }

    #[test]
    fn test_encode_seals_both_fields() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);

        let encoded = codec.encode(record(-4250, "Groceries")).unwrap();
        assert!(encoded.is_encrypted());
        assert_eq!(encoded.category.as_deref(), Some("Food"));

        let Amount::Sealed(amount) = &encoded.amount else {
            panic!("amount not sealed");
        };
        let key = cipher.0.as_ref().unwrap();
        assert_eq!(decrypt(amount, key).unwrap(), "-42.50");
        assert_eq!(decrypt(&encoded.description, key).unwrap(), "Groceries");
    }

    #[test]
    fn test_encode_while_locked_stores_plaintext() {
        let cipher = KeyCipher(None);
        let codec = RecordCodec::new(&cipher);

        let original = record(1000, "Lunch");
        let encoded = codec.encode(original.clone()).unwrap();
        assert_eq!(encoded, original);
        assert!(encoded.encrypted.is_none());
    }

    #[test]
    fn test_decode_round_trip() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);
        let original = record(-4250, "Groceries");

        let decoded = codec.decode(codec.encode(original.clone()).unwrap());
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_mixed_corpus_decodes_only_flagged() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);

        let legacy = record(500, "Legacy coffee");
        let sealed = codec.encode(record(-1999, "Books")).unwrap();
        let decoded = codec.decode_all(vec![legacy.clone(), sealed]);

        assert_eq!(decoded[0], legacy);
        assert_eq!(decoded[1].amount, Amount::Plain(Money::from_cents(-1999)));
        assert_eq!(decoded[1].description, "Books");
        assert!(!decoded[1].is_encrypted());

        // Locked: flagged records stay sealed, legacy still passes through
        let locked = KeyCipher(None);
        let codec = RecordCodec::new(&locked);
        let sealed = RecordCodec::new(&cipher).encode(record(-1999, "Books")).unwrap();
        let decoded = codec.decode_all(vec![legacy.clone(), sealed.clone()]);
        assert_eq!(decoded, vec![legacy, sealed]);
    }

    #[test]
    fn test_plaintext_that_looks_like_ciphertext_is_not_decrypted() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);

        // A legacy description that happens to be valid base64 of the right length
        let mut legacy = record(100, "");
        legacy.description = "QUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFB".to_string();
        assert_eq!(codec.decode(legacy.clone()), legacy);
    }

    #[test]
    fn test_decode_is_atomic_over_fields() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);

        let mut sealed = codec.encode(record(-700, "Cinema")).unwrap();
        sealed.description = "tampered".to_string();
        let decoded = codec.decode(sealed.clone());
        assert_eq!(decoded, sealed);
        assert!(decoded.is_encrypted());
    }

    #[test]
    fn test_wrong_key_leaves_record_sealed() {
        let writer = KeyCipher::unlocked();
        let reader = KeyCipher::unlocked();
        let sealed = RecordCodec::new(&writer).encode(record(300, "Tea")).unwrap();

        assert_eq!(RecordCodec::new(&reader).decode(sealed.clone()), sealed);
    }

    #[test]
    fn test_encode_is_idempotent_on_sealed_records() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);
        let sealed = codec.encode(record(300, "Tea")).unwrap();
        assert_eq!(codec.encode(sealed.clone()).unwrap(), sealed);
    }

    #[test]
    fn test_encode_rejects_unflagged_sealed_amount() {
        let cipher = KeyCipher::unlocked();
        let codec = RecordCodec::new(&cipher);
        let mut bad = record(300, "Tea");
        bad.amount = Amount::Sealed("abc".to_string());
        assert!(codec.encode(bad).unwrap_err().is_validation());
    }

    #[test]
    fn test_session_controller_as_cipher() {
        let temp = TempDir::new().unwrap();
        let paths = LockPaths::with_base_dir(temp.path().to_path_buf());
        let mut session = SessionController::new(
            UserId::new("alice"),
            FileSettingsBackend::new(paths.encryption_settings_file()),
            FileKeyStore::new(&paths),
            BiometricGate::new(
                NoPlatformAuthenticator,
                CredentialStore::new(paths.credentials_file()),
            ),
            SessionConfig::for_tests(),
        );
        session.initialize().unwrap();

        let legacy = record(250, "Bus fare");
        let passphrase = Passphrase::new("correct-horse-battery");
        session.setup(&passphrase, &passphrase, None).unwrap();

        let sealed = RecordCodec::new(&session).encode(record(-4250, "Groceries")).unwrap();
        assert!(sealed.is_encrypted());

        let decoded = RecordCodec::new(&session).decode_all(vec![legacy.clone(), sealed.clone()]);
        assert_eq!(decoded[0], legacy);
        assert_eq!(decoded[1].description, "Groceries");

        session.lock();
        let decoded = RecordCodec::new(&session).decode_all(vec![legacy.clone(), sealed.clone()]);
        assert_eq!(decoded, vec![legacy, sealed]);
        assert_eq!(session.swallowed_decrypt_failures(), 0);
    }
}
