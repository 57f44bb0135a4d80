//! Error types for the application lifecycle

use thiserror::Error;

use crate::backend::traits::{EncryptionError, LedgerError, VerifierError};

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Controller error taxonomy.
///
/// Every variant is meant to surface to the presentation layer as a
/// user-visible notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// No active identity
    #[error("Not authenticated: connect an identity first")]
    NotAuthenticated,

    /// Bad input shape or range, rejected before any external call
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The encryption provider could not produce a ciphertext
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The signer declined the transaction
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// Transport or contract failure on the write path
    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// The read path could not be reached
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Decryption or proof verification did not complete
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// The id does not reference a known application
    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    /// A verification for this application is already running
    #[error("Verification already in flight for application {0}")]
    VerificationInFlight(String),
}

impl ControllerError {
    /// Classify a write-path failure.
    pub(crate) fn from_write(err: LedgerError) -> Self {
        match err {
            LedgerError::SignerRejected(msg) => ControllerError::SubmissionRejected(msg),
            other => ControllerError::LedgerWriteFailed(other.to_string()),
        }
    }

    /// Classify a read-path failure.
    pub(crate) fn from_read(err: LedgerError) -> Self {
        ControllerError::LedgerUnavailable(err.to_string())
    }
}

impl From<EncryptionError> for ControllerError {
    fn from(err: EncryptionError) -> Self {
        ControllerError::EncryptionFailed(err.to_string())
    }
}

impl From<VerifierError> for ControllerError {
    fn from(err: VerifierError) -> Self {
        ControllerError::DecryptionFailed(err.to_string())
    }
}
