//! Biometric gate
//!
//! Wraps a platform authenticator (fingerprint, face, device PIN) so that a
//! verified user can re-release the key already held in the key store. The
//! gate never produces key material: a successful verification only
//! authorizes the session controller to call `load_key`.

mod authenticator;

pub use authenticator::{
    Assertion, AuthenticatorError, CredentialRequest, NoPlatformAuthenticator,
    PlatformAuthenticator,
};

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, info, warn};

use crate::error::{LockError, LockResult};
use crate::models::UserId;
use crate::storage::CredentialStore;

/// Size of the random challenge sent with each assertion request
pub const CHALLENGE_LEN: usize = 32;

/// Gate in front of the key store, backed by a platform authenticator
pub struct BiometricGate<A: PlatformAuthenticator> {
    authenticator: A,
    credentials: CredentialStore,
}

impl<A: PlatformAuthenticator> BiometricGate<A> {
    /// Create a gate from an authenticator and a credential id store
    pub fn new(authenticator: A, credentials: CredentialStore) -> Self {
        Self {
            authenticator,
            credentials,
        }
    }

    /// Whether a user-verifying platform authenticator is present
    ///
    /// Never prompts the user.
    pub fn is_biometric_available(&self) -> bool {
        self.authenticator.is_available()
    }

    /// Create a platform credential for the user and remember its id
    ///
    /// Returns the base64 credential id. Callers treat any error as
    /// "skip biometric", never as fatal.
    pub fn register_biometric(&self, user: &UserId, display_name: &str) -> LockResult<String> {
        if !self.authenticator.is_available() {
            return Err(LockError::Biometric(
                AuthenticatorError::NotAvailable.to_string(),
            ));
        }

        let request = CredentialRequest {
            user_id: user.clone(),
            display_name: display_name.to_string(),
            challenge: random_challenge(),
        };

        let raw_id = self
            .authenticator
            .create_credential(&request)
            .map_err(|e| LockError::Biometric(e.to_string()))?;
        if raw_id.is_empty() {
            return Err(LockError::Biometric(
                "Authenticator returned an empty credential id".to_string(),
            ));
        }

        let credential_id = STANDARD.encode(&raw_id);
        self.credentials.set_credential_id(user, &credential_id)?;

        info!(user = %user, "biometric credential registered");
        Ok(credential_id)
    }

    /// Ask the authenticator to verify the user against their credential
    ///
    /// Returns `true` only for a user-verified assertion on the stored
    /// credential that echoes this call's challenge. No credential means
    /// `false` without a prompt. Cancellation, timeouts and every other
    /// failure also yield `false`.
    pub fn verify_biometric(&self, user: &UserId) -> bool {
        let credential_id = match self.credentials.get_credential_id(user) {
            Ok(Some(id)) => id,
            Ok(None) => return false,
            Err(e) => {
                warn!(user = %user, error = %e, "could not read biometric credential id");
                return false;
            }
        };

        let Ok(raw_id) = STANDARD.decode(&credential_id) else {
            warn!(user = %user, "stored biometric credential id is not valid base64");
            return false;
        };

        let challenge = random_challenge();
        let assertion = match self.authenticator.get_assertion(&raw_id, &challenge) {
            Ok(assertion) => assertion,
            Err(AuthenticatorError::Cancelled) => {
                debug!(user = %user, "biometric prompt cancelled");
                return false;
            }
            Err(e) => {
                warn!(user = %user, error = %e, "biometric assertion failed");
                return false;
            }
        };

        if assertion.credential_id != raw_id {
            warn!(user = %user, "assertion was for a different credential");
            return false;
        }
        if assertion.challenge != challenge {
            warn!(user = %user, "assertion did not echo the challenge");
            return false;
        }
        if !assertion.user_verified {
            debug!(user = %user, "assertion lacked user verification");
            return false;
        }

        true
    }

    /// The wrapped platform authenticator
    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Look up the stored credential id
    pub fn get_credential_id(&self, user: &UserId) -> LockResult<Option<String>> {
        self.credentials.get_credential_id(user)
    }

    /// Forget the stored credential id
    pub fn clear_credential_id(&self, user: &UserId) -> LockResult<()> {
        self.credentials.clear_credential_id(user)
    }

    /// Whether a credential id is stored for the user
    ///
    /// Read failures count as "not registered".
    pub fn has_credential(&self, user: &UserId) -> bool {
        matches!(self.credentials.get_credential_id(user), Ok(Some(_)))
    }
}

fn random_challenge() -> Vec<u8> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    OsRng.fill_bytes(&mut challenge);
    challenge
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted authenticators for unit tests

    use std::cell::{Cell, RefCell};

    use super::*;

    /// How the fake responds to assertion requests
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Behaviour {
        Verify,
        Cancel,
        TimeOut,
        NoUserVerification,
        WrongChallenge,
        WrongCredential,
    }

    pub struct FakeAuthenticator {
        pub available: bool,
        pub behaviour: Cell<Behaviour>,
        pub prompts: Cell<usize>,
        pub last_request: RefCell<Option<CredentialRequest>>,
    }

    impl FakeAuthenticator {
        pub fn new(behaviour: Behaviour) -> Self {
            Self {
                available: true,
                behaviour: Cell::new(behaviour),
                prompts: Cell::new(0),
                last_request: RefCell::new(None),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new(Behaviour::Verify)
            }
        }
    }

    impl PlatformAuthenticator for FakeAuthenticator {
        fn is_available(&self) -> bool {
            self.available
        }

        fn create_credential(
            &self,
            request: &CredentialRequest,
        ) -> Result<Vec<u8>, AuthenticatorError> {
            if !self.available {
                return Err(AuthenticatorError::NotAvailable);
            }
            *self.last_request.borrow_mut() = Some(request.clone());
            Ok(format!("cred-{}", request.user_id).into_bytes())
        }

        fn get_assertion(
            &self,
            credential_id: &[u8],
            challenge: &[u8],
        ) -> Result<Assertion, AuthenticatorError> {
            self.prompts.set(self.prompts.get() + 1);
            if !self.available {
                return Err(AuthenticatorError::NotAvailable);
            }

            let mut assertion = Assertion {
                credential_id: credential_id.to_vec(),
                challenge: challenge.to_vec(),
                user_verified: true,
            };
            match self.behaviour.get() {
                Behaviour::Verify => {}
                Behaviour::Cancel => return Err(AuthenticatorError::Cancelled),
                Behaviour::TimeOut => return Err(AuthenticatorError::TimedOut),
                Behaviour::NoUserVerification => assertion.user_verified = false,
                Behaviour::WrongChallenge => assertion.challenge = vec![0u8; CHALLENGE_LEN],
                Behaviour::WrongCredential => assertion.credential_id = b"other".to_vec(),
            }
            Ok(assertion)
        }
    }
}
