//! Data model for confidential scholarship applications.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ControllerError, Result};

/// Lowest accepted academic score.
pub const MIN_ACADEMIC_SCORE: i64 = 1;
/// Highest accepted academic score.
pub const MAX_ACADEMIC_SCORE: i64 = 10;

/// Identity of a connected party (wallet address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of the application contract on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(String);

impl ContractAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque on-ledger reference to an encrypted value.
///
/// Only the decryption verifier can dereference it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CiphertextHandle(String);

impl CiphertextHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a submitted ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub tx_hash: String,
}

impl TxHandle {
    pub fn new(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
        }
    }
}

/// Ciphertext plus correctness proof produced by the encryption provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Authoritative verification state as recorded on the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Verification {
    #[default]
    Unverified,
    Verified { clear_income: u64 },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }

    /// Verified cleartext income, if any.
    pub fn clear_income(&self) -> Option<u64> {
        match self {
            Verification::Verified { clear_income } => Some(*clear_income),
            Verification::Unverified => None,
        }
    }
}

/// Controller-side view of a verification, including the transient
/// in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    VerifyingInFlight,
    Verified(u64),
}

/// Raw application record as returned by the ledger read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub name: String,
    pub creator: Identity,
    /// Seconds since epoch, set by the ledger
    pub timestamp: u64,
    pub academic_score: u8,
    /// Second public slot; always written as 0
    pub reserved_slot: u64,
    pub is_verified: bool,
    /// Meaningful only when `is_verified` is set
    pub decrypted_value: u64,
}

/// One confidential scholarship submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub applicant_name: String,
    pub academic_score: u8,
    /// Seconds since epoch
    pub created_at: u64,
    pub creator: Identity,
    pub income_handle: CiphertextHandle,
    /// Reserved extension slot, carried verbatim
    pub reserved_slot: u64,
    pub verification: Verification,
    /// Client-local value recovered by decryption, not authoritative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locally_decrypted_income: Option<u64>,
}

impl Application {
    /// Assemble an application from its ledger record and ciphertext handle.
    pub fn from_record(
        id: impl Into<String>,
        record: ApplicationRecord,
        income_handle: CiphertextHandle,
    ) -> Self {
        let verification = if record.is_verified {
            Verification::Verified {
                clear_income: record.decrypted_value,
            }
        } else {
            Verification::Unverified
        };

        Self {
            id: id.into(),
            applicant_name: record.name,
            academic_score: record.academic_score,
            created_at: record.timestamp,
            creator: record.creator,
            income_handle,
            reserved_slot: record.reserved_slot,
            verification,
            locally_decrypted_income: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification.is_verified()
    }
}

/// Input for a new application, as typed by the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub income_claim: i64,
    pub academic_score: i64,
}

/// A submit request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidSubmission {
    pub name: String,
    pub income: u64,
    pub academic_score: u8,
}

impl SubmitRequest {
    pub fn new(name: impl Into<String>, income_claim: i64, academic_score: i64) -> Self {
        Self {
            name: name.into(),
            income_claim,
            academic_score,
        }
    }

    /// Check shape and ranges without touching any collaborator.
    pub fn validate(&self) -> Result<()> {
        self.validated().map(|_| ())
    }

    pub(crate) fn validated(&self) -> Result<ValidSubmission> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ControllerError::ValidationFailed(
                "applicant name is required".into(),
            ));
        }

        if self.income_claim < 0 {
            return Err(ControllerError::ValidationFailed(format!(
                "income must be non-negative, got {}",
                self.income_claim
            )));
        }

        if !(MIN_ACADEMIC_SCORE..=MAX_ACADEMIC_SCORE).contains(&self.academic_score) {
            return Err(ControllerError::ValidationFailed(format!(
                "academic score must be between {} and {}, got {}",
                MIN_ACADEMIC_SCORE, MAX_ACADEMIC_SCORE, self.academic_score
            )));
        }

        Ok(ValidSubmission {
            name: name.to_string(),
            income: self.income_claim as u64,
            academic_score: self.academic_score as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(is_verified: bool, decrypted_value: u64) -> ApplicationRecord {
        ApplicationRecord {
            name: "Alice".into(),
            creator: Identity::new("0xabc"),
            timestamp: 1_700_000_000,
            academic_score: 8,
            reserved_slot: 0,
            is_verified,
            decrypted_value,
        }
    }

    #[test]
    fn test_from_record_unverified_ignores_decrypted_value() {
        let app = Application::from_record(
            "scholarship-1",
            record(false, 123),
            CiphertextHandle::new("0x01"),
        );
        assert_eq!(app.verification, Verification::Unverified);
        assert_eq!(app.locally_decrypted_income, None);
    }

    #[test]
    fn test_from_record_verified() {
        let app = Application::from_record(
            "scholarship-1",
            record(true, 40_000),
            CiphertextHandle::new("0x01"),
        );
        assert_eq!(app.verification.clear_income(), Some(40_000));
    }

    #[test]
    fn test_validate_score_bounds() {
        assert!(SubmitRequest::new("Alice", 40_000, 1).validate().is_ok());
        assert!(SubmitRequest::new("Alice", 40_000, 10).validate().is_ok());
        assert!(matches!(
            SubmitRequest::new("Alice", 40_000, 0).validate(),
            Err(ControllerError::ValidationFailed(_))
        ));
        assert!(matches!(
            SubmitRequest::new("Alice", 40_000, 11).validate(),
            Err(ControllerError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validate_income_and_name() {
        assert!(matches!(
            SubmitRequest::new("Alice", -1, 8).validate(),
            Err(ControllerError::ValidationFailed(_))
        ));
        assert!(matches!(
            SubmitRequest::new("   ", 10, 8).validate(),
            Err(ControllerError::ValidationFailed(_))
        ));

        let valid = SubmitRequest::new("  Alice ", 0, 7).validated().unwrap();
        assert_eq!(valid.name, "Alice");
        assert_eq!(valid.income, 0);
        assert_eq!(valid.academic_score, 7);
    }

    #[test]
    fn test_application_json_shape() {
        let app = Application::from_record(
            "scholarship-1",
            record(true, 40_000),
            CiphertextHandle::new("0x01"),
        );
        let json = serde_json::to_value(&app).unwrap();

        assert_eq!(json["income_handle"], "0x01");
        assert_eq!(json["verification"]["state"], "verified");
        assert_eq!(json["verification"]["clear_income"], 40_000);
        assert!(json.get("locally_decrypted_income").is_none());
    }
}
