//! Platform authenticator seam
//!
//! The public-key credential API of the host platform lives behind
//! [`PlatformAuthenticator`]. Implementations block until the user answers
//! the prompt or cancels it.

use thiserror::Error;

use crate::models::UserId;

/// Errors reported by a platform authenticator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorError {
    /// The user dismissed the prompt
    #[error("Biometric prompt was cancelled")]
    Cancelled,

    /// The prompt expired without an answer
    #[error("Biometric prompt timed out")]
    TimedOut,

    /// No user-verifying authenticator on this device
    #[error("No platform authenticator is available")]
    NotAvailable,

    /// The platform refused the request
    #[error("Biometric request was not allowed")]
    NotAllowed,

    /// Any other authenticator failure
    #[error("Biometric authentication failed: {0}")]
    Failed(String),
}

/// Parameters for creating a new platform credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub user_id: UserId,
    pub display_name: String,
    pub challenge: Vec<u8>,
}

/// A signed assertion returned by the authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Credential the assertion was made with
    pub credential_id: Vec<u8>,
    /// Challenge the authenticator signed
    pub challenge: Vec<u8>,
    /// Whether the user was verified (biometric or PIN), not just present
    pub user_verified: bool,
}

/// Device-local authenticator capable of user verification
pub trait PlatformAuthenticator {
    /// Detect an authenticator without prompting
    fn is_available(&self) -> bool;

    /// Create a credential bound to this device; returns its raw id
    fn create_credential(&self, request: &CredentialRequest) -> Result<Vec<u8>, AuthenticatorError>;

    /// Prompt the user and assert possession of `credential_id`
    fn get_assertion(
        &self,
        credential_id: &[u8],
        challenge: &[u8],
    ) -> Result<Assertion, AuthenticatorError>;
}

/// Authenticator for devices without biometric hardware
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlatformAuthenticator;

impl PlatformAuthenticator for NoPlatformAuthenticator {
    fn is_available(&self) -> bool {
        false
    }

    fn create_credential(&self, _request: &CredentialRequest) -> Result<Vec<u8>, AuthenticatorError> {
        Err(AuthenticatorError::NotAvailable)
    }

    fn get_assertion(
        &self,
        _credential_id: &[u8],
        _challenge: &[u8],
    ) -> Result<Assertion, AuthenticatorError> {
        Err(AuthenticatorError::NotAvailable)
    }
}
