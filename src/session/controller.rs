//! Encryption session controller
//!
//! Owns the in-memory key for one authenticated user and drives the
//! `NoSettings -> Locked -> Unlocked` state machine. Everything else in the
//! application goes through [`SessionController::encrypt_value`] and
//! [`SessionController::decrypt_value`], which degrade to passthrough when no
//! key is available.
//!
//! # Biometric retention
//!
//! When a biometric credential is registered, an inactivity lock drops the
//! in-memory key but keeps the persisted one so biometric unlock can release
//! it again. On such a device, locking stops a casual glance but not someone
//! holding the device who can satisfy (or spoof) the authenticator. The
//! credential has no expiry or rotation. Sign-out always clears everything.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use crate::audit::{AuditEntry, AuditLogger, SecurityEvent, UnlockMethod};
use crate::biometric::{BiometricGate, PlatformAuthenticator};
use crate::config::{LockPaths, SessionConfig};
use crate::crypto::{
    create_verification_hash, decrypt, derive_key, encrypt, generate_salt,
    validate_new_passphrase, verify_passphrase, DerivedKey, EncryptedField, Passphrase,
    MAX_ITERATIONS,
};
use crate::error::{LockError, LockResult};
use crate::models::{Amount, EncryptionSettings, Record, UserId};
use crate::storage::{CredentialStore, FileKeyStore, FileSettingsBackend, KeyStore, SettingsBackend};

use super::activity::{ActivityKind, IdleTimer};

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Encryption has never been configured for this user
    NoSettings,
    /// Settings exist but no key is in memory
    Locked,
    /// The key is in memory
    Unlocked,
}

/// Session controller over the file-backed stores
pub type FileSessionController<A> = SessionController<FileSettingsBackend, FileKeyStore, A>;

/// Stateful orchestrator of setup, unlock, locking and field encryption
pub struct SessionController<B, K, A>
where
    B: SettingsBackend,
    K: KeyStore,
    A: PlatformAuthenticator,
{
    user: UserId,
    backend: B,
    key_store: K,
    biometric: BiometricGate<A>,
    config: SessionConfig,
    audit: Option<AuditLogger>,
    settings: Option<EncryptionSettings>,
    key: Option<DerivedKey>,
    idle: IdleTimer,
    swallowed_decrypt_failures: AtomicU64,
}

impl<A: PlatformAuthenticator> FileSessionController<A> {
    /// Build a controller over the local file stores under `paths`
    ///
    /// Attaches the audit journal when `config.audit_log` is set.
    pub fn from_paths(
        user: UserId,
        paths: &LockPaths,
        config: SessionConfig,
        authenticator: A,
    ) -> LockResult<Self> {
        config.validate()?;
        paths.ensure_directories()?;

        let backend = FileSettingsBackend::new(paths.encryption_settings_file());
        let key_store = FileKeyStore::new(paths);
        let biometric = BiometricGate::new(
            authenticator,
            CredentialStore::new(paths.credentials_file()),
        );

        let audit_enabled = config.audit_log;
        let controller = Self::new(user, backend, key_store, biometric, config);
        Ok(if audit_enabled {
            controller.with_audit(AuditLogger::new(paths.audit_log()))
        } else {
            controller
        })
    }
}

impl<B, K, A> SessionController<B, K, A>
where
    B: SettingsBackend,
    K: KeyStore,
    A: PlatformAuthenticator,
{
    /// Create a controller for `user`
    ///
    /// The state is `NoSettings` until [`initialize`](Self::initialize) has
    /// fetched the user's settings.
    pub fn new(
        user: UserId,
        backend: B,
        key_store: K,
        biometric: BiometricGate<A>,
        config: SessionConfig,
    ) -> Self {
        let idle = IdleTimer::new(config.idle_timeout(), Utc::now());
        Self {
            user,
            backend,
            key_store,
            biometric,
            config,
            audit: None,
            settings: None,
            key: None,
            idle,
            swallowed_decrypt_failures: AtomicU64::new(0),
        }
    }

    /// Record security events in `logger`
    pub fn with_audit(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    /// Fetch settings and restore a persisted key if there is one
    ///
    /// Backend errors are returned so the caller can retry. A key store that
    /// cannot be read leaves the session `Locked`.
    pub fn initialize(&mut self) -> LockResult<SessionState> {
        self.key = None;
        self.settings = self.backend.get_encryption_settings(&self.user)?;

        let Some(settings) = &self.settings else {
            debug!(user = %self.user, "encryption not configured");
            return Ok(SessionState::NoSettings);
        };

        match self.key_store.load_key(&self.user) {
            Ok(Some(key)) if verify_passphrase(&key, settings.verification_hash.as_str()) => {
                self.key = Some(key);
                self.idle.touch(Utc::now());
                info!(user = %self.user, "session restored from key store");
                self.audit_event(SecurityEvent::Unlock(UnlockMethod::Restored), None);
            }
            Ok(Some(_)) => {
                warn!(user = %self.user, "persisted key does not match current settings");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(user = %self.user, error = %e, "could not read key store");
            }
        }

        Ok(self.state())
    }

    /// The authenticated user this controller serves
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        match (&self.settings, &self.key) {
            (None, _) => SessionState::NoSettings,
            (Some(_), None) => SessionState::Locked,
            (Some(_), Some(_)) => SessionState::Unlocked,
        }
    }

    /// Whether encryption is configured for this user
    pub fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    /// Whether the key is in memory
    pub fn is_unlocked(&self) -> bool {
        self.state() == SessionState::Unlocked
    }

    /// Whether a biometric credential is registered for this user
    pub fn has_biometric(&self) -> bool {
        self.biometric.has_credential(&self.user)
    }

    /// The biometric gate
    pub fn biometric(&self) -> &BiometricGate<A> {
        &self.biometric
    }

    /// Configure encryption for the first time
    ///
    /// Validation errors are returned before any key derivation. If the key
    /// store rejects the new key, an error is returned but the session is
    /// still `Unlocked` for the life of this controller. A biometric display
    /// name requests enrolment; enrolment failure is logged and skipped.
    pub fn setup(
        &mut self,
        passphrase: &Passphrase,
        confirmation: &Passphrase,
        biometric_display_name: Option<&str>,
    ) -> LockResult<()> {
        if self.settings.is_some() {
            return Err(LockError::AlreadyConfigured);
        }
        validate_new_passphrase(passphrase, confirmation, self.config.min_passphrase_len)?;

        let (settings, key) = self.derive_settings(passphrase)?;
        self.backend.setup_encryption(&self.user, &settings)?;

        self.settings = Some(settings);
        self.key = Some(key);
        self.idle.touch(Utc::now());
        info!(user = %self.user, "encryption configured");
        self.audit_event(SecurityEvent::Setup, None);

        self.persist_key()?;

        if let Some(display_name) = biometric_display_name {
            if let Err(e) = self.enable_biometric(display_name) {
                warn!(user = %self.user, error = %e, "biometric enrolment skipped");
            }
        }

        Ok(())
    }

    /// Unlock with the user's passphrase
    ///
    /// A wrong passphrase and unusable stored settings both report
    /// [`LockError::IncorrectPassphrase`]. On failure the state is unchanged.
    pub fn unlock_with_passphrase(&mut self, passphrase: &Passphrase) -> LockResult<()> {
        if self.settings.is_none() {
            self.settings = self.backend.get_encryption_settings(&self.user)?;
        }
        let settings = self.settings.as_ref().ok_or(LockError::NotConfigured)?;

        let Some(key) = self.key_for(settings, passphrase) else {
            info!(user = %self.user, "passphrase unlock rejected");
            self.audit_event(SecurityEvent::FailedUnlock(UnlockMethod::Passphrase), None);
            return Err(LockError::IncorrectPassphrase);
        };

        self.key = Some(key);
        self.idle.touch(Utc::now());
        info!(user = %self.user, "session unlocked with passphrase");
        self.audit_event(SecurityEvent::Unlock(UnlockMethod::Passphrase), None);

        self.persist_key()
    }

    /// Unlock by biometric verification
    ///
    /// Success only authorizes reading the persisted key. With no persisted
    /// key this returns `false` and the passphrase is required. Settings are
    /// fetched first if this controller has not loaded them.
    pub fn unlock_with_biometric(&mut self) -> bool {
        if self.settings.is_none() {
            match self.backend.get_encryption_settings(&self.user) {
                Ok(settings) => self.settings = settings,
                Err(e) => {
                    warn!(user = %self.user, error = %e, "could not fetch encryption settings");
                    return false;
                }
            }
        }
        let Some(settings) = &self.settings else {
            return false;
        };
        if self.key.is_some() {
            return true;
        }

        if !self.biometric.verify_biometric(&self.user) {
            self.audit_event(SecurityEvent::FailedUnlock(UnlockMethod::Biometric), None);
            return false;
        }

        let key = match self.key_store.load_key(&self.user) {
            Ok(Some(key)) => key,
            Ok(None) => {
                info!(user = %self.user, "biometric verified but no key is persisted");
                return false;
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "could not read key store");
                return false;
            }
        };

        if !verify_passphrase(&key, settings.verification_hash.as_str()) {
            warn!(user = %self.user, "persisted key does not match current settings");
            return false;
        }

        self.key = Some(key);
        self.idle.touch(Utc::now());
        info!(user = %self.user, "session unlocked with biometric");
        self.audit_event(SecurityEvent::Unlock(UnlockMethod::Biometric), None);
        true
    }

    /// Register a biometric credential for this user
    ///
    /// Only available while unlocked, so the key is known to be persisted.
    pub fn enable_biometric(&mut self, display_name: &str) -> LockResult<String> {
        if !self.is_unlocked() {
            return Err(LockError::Locked);
        }

        let credential_id = self.biometric.register_biometric(&self.user, display_name)?;
        self.audit_event(SecurityEvent::BiometricEnrolled, None);
        Ok(credential_id)
    }

    /// Remove the biometric credential
    ///
    /// If the session is locked, the retained persisted key is cleared too.
    pub fn disable_biometric(&mut self) -> LockResult<()> {
        self.biometric.clear_credential_id(&self.user)?;
        if self.key.is_none() {
            self.key_store.clear_key(&self.user)?;
        }
        info!(user = %self.user, "biometric credential removed");
        self.audit_event(SecurityEvent::BiometricRemoved, None);
        Ok(())
    }

    /// Note user input activity
    pub fn record_activity(&mut self, kind: ActivityKind) {
        self.record_activity_at(kind, Utc::now());
    }

    /// Note user input activity at `now`
    pub fn record_activity_at(&mut self, kind: ActivityKind, now: DateTime<Utc>) {
        if self.key.is_some() {
            trace!(?kind, "activity");
            self.idle.touch(now);
        }
    }

    /// Lock if the inactivity timeout has elapsed
    ///
    /// Returns `true` if this call locked the session.
    pub fn check_idle(&mut self) -> bool {
        self.check_idle_at(Utc::now())
    }

    /// Lock if the inactivity timeout has elapsed at `now`
    pub fn check_idle_at(&mut self, now: DateTime<Utc>) -> bool {
        if self.key.is_none() || !self.idle.is_expired(now) {
            return false;
        }

        info!(user = %self.user, "locking after inactivity");
        self.lock_with(SecurityEvent::IdleLock);
        true
    }

    /// Lock now, with the same key retention as an inactivity lock
    pub fn lock(&mut self) {
        if self.key.is_some() {
            self.lock_with(SecurityEvent::Lock);
        }
    }

    /// Sign out: clear the key from memory and from the key store
    ///
    /// The in-memory key is gone even if clearing the store fails.
    pub fn sign_out(&mut self) -> LockResult<()> {
        self.key = None;
        let cleared = self.key_store.clear_key(&self.user);
        info!(user = %self.user, "signed out");
        self.audit_event(SecurityEvent::SignOut, None);
        cleared
    }

    /// Replace the passphrase
    ///
    /// Requires an unlocked session and proof of the current passphrase.
    /// Encrypted records in `records` that open under the old key are
    /// re-encrypted under the new one after the backend accepts the new
    /// settings; the number re-keyed is returned. Records that do not open
    /// are left as they are.
    pub fn change_passphrase(
        &mut self,
        current: &Passphrase,
        new_passphrase: &Passphrase,
        confirmation: &Passphrase,
        records: &mut [Record],
    ) -> LockResult<usize> {
        if !self.is_unlocked() {
            return Err(LockError::Locked);
        }
        validate_new_passphrase(new_passphrase, confirmation, self.config.min_passphrase_len)?;

        let settings = self.settings.as_ref().ok_or(LockError::NotConfigured)?;
        let Some(old_key) = self.key_for(settings, current) else {
            self.audit_event(SecurityEvent::FailedUnlock(UnlockMethod::Passphrase), None);
            return Err(LockError::IncorrectPassphrase);
        };

        let (new_settings, new_key) = self.derive_settings(new_passphrase)?;

        let mut rekeyed = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if !record.is_encrypted() {
                continue;
            }
            match rekey_record(record, &old_key, &new_key) {
                Some(fields) => rekeyed.push((index, fields)),
                None => debug!(record = %record.id, "record did not open under the old key"),
            }
        }

        self.backend.replace_encryption(&self.user, &new_settings)?;

        let count = rekeyed.len();
        for (index, (amount, description)) in rekeyed {
            records[index].amount = Amount::Sealed(amount.into_string());
            records[index].description = description.into_string();
        }

        self.settings = Some(new_settings);
        self.key = Some(new_key);
        self.idle.touch(Utc::now());
        info!(user = %self.user, rekeyed = count, "passphrase changed");
        self.audit_event(
            SecurityEvent::PassphraseChange,
            Some(format!("{} records re-keyed", count)),
        );

        self.persist_key()?;
        Ok(count)
    }

    /// Serve a different authenticated user
    ///
    /// The previous user's key is dropped from memory before the new user's
    /// settings are fetched.
    pub fn switch_user(&mut self, user: UserId) -> LockResult<SessionState> {
        self.key = None;
        self.settings = None;
        debug!(from = %self.user, to = %user, "switching user");
        self.user = user;
        self.initialize()
    }

    /// Encrypt a value if the session is unlocked, else return it unchanged
    pub fn encrypt_value(&self, plaintext: &str) -> String {
        match self.try_encrypt(plaintext) {
            Some(Ok(field)) => field.into_string(),
            Some(Err(e)) => {
                warn!(error = %e, "encryption failed, storing plaintext");
                plaintext.to_string()
            }
            None => plaintext.to_string(),
        }
    }

    /// Decrypt a value if possible, else return it unchanged
    ///
    /// A value that fails to decrypt is assumed to be legacy plaintext. Such
    /// failures are counted in
    /// [`swallowed_decrypt_failures`](Self::swallowed_decrypt_failures).
    pub fn decrypt_value(&self, ciphertext: &str) -> String {
        match self.try_decrypt(ciphertext) {
            Some(Ok(plaintext)) => plaintext,
            Some(Err(_)) => {
                self.swallowed_decrypt_failures
                    .fetch_add(1, Ordering::Relaxed);
                debug!("value did not decrypt, passing through");
                ciphertext.to_string()
            }
            None => ciphertext.to_string(),
        }
    }

    /// Number of decrypt failures hidden by [`decrypt_value`](Self::decrypt_value)
    pub fn swallowed_decrypt_failures(&self) -> u64 {
        self.swallowed_decrypt_failures.load(Ordering::Relaxed)
    }

    /// Encrypt under the session key; `None` when there is no key
    pub(crate) fn try_encrypt(&self, plaintext: &str) -> Option<LockResult<EncryptedField>> {
        self.key.as_ref().map(|key| encrypt(plaintext, key))
    }

    /// Decrypt under the session key; `None` when there is no key
    pub(crate) fn try_decrypt(&self, ciphertext: &str) -> Option<LockResult<String>> {
        self.key.as_ref().map(|key| decrypt(ciphertext, key))
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn derive_settings(
        &self,
        passphrase: &Passphrase,
    ) -> LockResult<(EncryptionSettings, DerivedKey)> {
        let salt = generate_salt();
        let iterations = self.config.kdf_iterations;
        let key = derive_key(passphrase.as_str(), &salt, iterations)?;
        let verification_hash = create_verification_hash(&key)?;
        Ok((
            EncryptionSettings::new(&salt, verification_hash, iterations),
            key,
        ))
    }

    /// Re-derive and check a key from stored settings
    ///
    /// The stored iteration count must lie between the configured cost and
    /// [`MAX_ITERATIONS`]; anything else is treated like a wrong passphrase.
    fn key_for(
        &self,
        settings: &EncryptionSettings,
        passphrase: &Passphrase,
    ) -> Option<DerivedKey> {
        let iterations = settings.iterations;
        if iterations < self.config.kdf_iterations || iterations > MAX_ITERATIONS {
            warn!(
                user = %self.user,
                iterations,
                "stored key derivation cost is out of bounds"
            );
            return None;
        }
        let salt = settings.salt_bytes().ok()?;
        let key = derive_key(passphrase.as_str(), &salt, iterations).ok()?;
        verify_passphrase(&key, settings.verification_hash.as_str()).then_some(key)
    }

    fn persist_key(&self) -> LockResult<()> {
        let Some(key) = &self.key else {
            return Ok(());
        };
        self.key_store.save_key(&self.user, key).map_err(|e| {
            warn!(
                user = %self.user,
                error = %e,
                "key not persisted; unlock will be needed after restart"
            );
            e
        })
    }

    fn lock_with(&mut self, event: SecurityEvent) {
        self.key = None;

        if self.biometric.has_credential(&self.user) {
            debug!(user = %self.user, "biometric registered, keeping persisted key");
        } else if let Err(e) = self.key_store.clear_key(&self.user) {
            warn!(user = %self.user, error = %e, "could not clear persisted key");
        }

        self.audit_event(event, None);
    }

    fn audit_event(&self, event: SecurityEvent, detail: Option<String>) {
        let Some(logger) = &self.audit else {
            return;
        };

        let mut entry = AuditEntry::new(&self.user, event);
        entry.detail = detail;
        if let Err(e) = logger.log(&entry) {
            warn!(error = %e, "failed to write audit entry");
        }
    }
}

fn rekey_record(
    record: &Record,
    old_key: &DerivedKey,
    new_key: &DerivedKey,
) -> Option<(EncryptedField, EncryptedField)> {
    let Amount::Sealed(amount) = &record.amount else {
        return None;
    };
    let amount = decrypt(amount, old_key).ok()?;
    let description = decrypt(&record.description, old_key).ok()?;
    Some((
        encrypt(&amount, new_key).ok()?,
        encrypt(&description, new_key).ok()?,
    ))
}
