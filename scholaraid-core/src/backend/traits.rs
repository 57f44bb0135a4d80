//! Collaborator traits for the ledger, the encryption provider and the
//! decryption verifier.
//!
//! The controller only ever talks to these traits. Concrete wallets, RPC
//! clients and FHE runtimes live behind them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{
    ApplicationRecord, CiphertextHandle, ContractAddress, EncryptedInput, Identity, TxHandle,
};

/// Width of one ABI-encoded cleartext word.
pub const CLEAR_VALUE_WORD: usize = 32;

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The signer declined to sign the transaction
    #[error("Signer rejected transaction: {0}")]
    SignerRejected(String),

    /// The application already carries a verified decryption
    #[error("Data already verified: {0}")]
    AlreadyVerified(String),

    /// No record exists for the id
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Ledger endpoint cannot be reached
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Network/transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Contract reverted
    #[error("Contract error: {0}")]
    Contract(String),
}

/// Error types for the encryption provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    /// Provider used before `initialize`
    #[error("Encryption provider not initialized")]
    NotInitialized,

    /// Provider or network failure
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Error types for the decryption verifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    /// Verifier service cannot be reached
    #[error("Verifier unavailable: {0}")]
    Unavailable(String),

    /// Decryption or proof generation failed
    #[error("Decryption failed: {0}")]
    Failed(String),

    /// The on-chain submission continuation failed
    #[error("Proof submission failed: {0}")]
    Submission(#[from] LedgerError),
}

impl VerifierError {
    /// Whether the failure means another actor verified first.
    pub fn is_already_verified(&self) -> bool {
        matches!(self, VerifierError::Submission(LedgerError::AlreadyVerified(_)))
    }
}

/// Write-path payload for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateApplication {
    pub id: String,
    pub name: String,
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
    pub academic_score: u8,
    pub reserved_slot: u64,
    pub tag: String,
}

/// Cleartext values recovered by the decryption verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptionOutcome {
    pub clear_values: HashMap<CiphertextHandle, u64>,
}

impl DecryptionOutcome {
    pub fn value_for(&self, handle: &CiphertextHandle) -> Option<u64> {
        self.clear_values.get(handle).copied()
    }
}

/// Read and write access to the application contract.
///
/// Writes return a [`TxHandle`]; callers await [`LedgerGateway::wait_for_confirmation`]
/// for finality.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Address of the application contract.
    async fn contract_address(&self) -> Result<ContractAddress, LedgerError>;

    async fn get_all_application_ids(&self) -> Result<Vec<String>, LedgerError>;

    async fn get_application_record(&self, id: &str) -> Result<ApplicationRecord, LedgerError>;

    async fn get_encrypted_income_handle(&self, id: &str) -> Result<CiphertextHandle, LedgerError>;

    async fn is_system_available(&self) -> Result<bool, LedgerError>;

    /// Submit a new application. `requester` is the signing identity.
    async fn create_application(
        &self,
        requester: &Identity,
        request: CreateApplication,
    ) -> Result<TxHandle, LedgerError>;

    /// Submit cleartext plus decryption proof for an application.
    async fn submit_decryption_proof(
        &self,
        id: &str,
        clear_values_encoded: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<TxHandle, LedgerError>;

    /// Wait until the transaction is final. No timeout.
    async fn wait_for_confirmation(&self, tx: &TxHandle) -> Result<(), LedgerError>;
}

/// Homomorphic encryption of plaintext inputs.
#[async_trait]
pub trait EncryptionProvider: Send + Sync {
    /// One-time runtime setup, performed when a session starts.
    async fn initialize(&self) -> Result<(), EncryptionError>;

    fn is_initialized(&self) -> bool;

    async fn encrypt(
        &self,
        contract: &ContractAddress,
        requester: &Identity,
        plaintext: u64,
    ) -> Result<EncryptedInput, EncryptionError>;
}

/// Continuation the verifier drives once a cleartext and its proof exist.
///
/// The verifier decides when (and whether) to call it.
#[async_trait]
pub trait ProofSubmitter: Send + Sync {
    async fn submit(
        &self,
        clear_values_encoded: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<TxHandle, LedgerError>;
}

/// Out-of-band decryption with on-chain proof submission.
#[async_trait]
pub trait DecryptionVerifier: Send + Sync {
    async fn verify_decryption(
        &self,
        handles: &[CiphertextHandle],
        contract: &ContractAddress,
        on_proof_ready: &dyn ProofSubmitter,
    ) -> Result<DecryptionOutcome, VerifierError>;
}

/// Encode cleartext values as consecutive 32-byte big-endian words.
pub fn encode_clear_values(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * CLEAR_VALUE_WORD);
    for value in values {
        let mut word = [0u8; CLEAR_VALUE_WORD];
        word[CLEAR_VALUE_WORD - 8..].copy_from_slice(&value.to_be_bytes());
        out.extend_from_slice(&word);
    }
    out
}

/// Decode words produced by [`encode_clear_values`].
///
/// Returns `None` on a ragged buffer or a value wider than 64 bits.
pub fn decode_clear_values(encoded: &[u8]) -> Option<Vec<u64>> {
    if encoded.len() % CLEAR_VALUE_WORD != 0 {
        return None;
    }

    encoded
        .chunks(CLEAR_VALUE_WORD)
        .map(|word| {
            let (high, low) = word.split_at(CLEAR_VALUE_WORD - 8);
            if high.iter().any(|b| *b != 0) {
                return None;
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(low);
            Some(u64::from_be_bytes(bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_value_encoding_layout() {
        let encoded = encode_clear_values(&[40_000]);
        assert_eq!(encoded.len(), 32);
        assert!(encoded[..24].iter().all(|b| *b == 0));
        assert_eq!(decode_clear_values(&encoded), Some(vec![40_000]));
    }

    #[test]
    fn test_decode_rejects_ragged_or_wide_words() {
        assert_eq!(decode_clear_values(&[0u8; 31]), None);

        let mut wide = encode_clear_values(&[1]);
        wide[0] = 1;
        assert_eq!(decode_clear_values(&wide), None);
    }

    #[test]
    fn test_already_verified_detection() {
        let err = VerifierError::from(LedgerError::AlreadyVerified("scholarship-1".into()));
        assert!(err.is_already_verified());
        assert!(!VerifierError::Failed("relayer down".into()).is_already_verified());
    }
}
