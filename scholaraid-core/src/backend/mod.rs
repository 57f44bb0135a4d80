//! Collaborator abstraction layer.
//!
//! Trait-based interfaces for the three external collaborators:
//! - Ledger gateway (contract reads and writes)
//! - Encryption provider (FHE input encryption)
//! - Decryption verifier (out-of-band decryption with on-chain proof)
//!
//! plus in-memory implementations for tests and simulation.

pub mod mock;
pub mod traits;

pub use mock::{InMemoryLedger, MockDecryptionVerifier, MockEncryptionProvider};
pub use traits::{
    decode_clear_values, encode_clear_values, CreateApplication, DecryptionOutcome,
    DecryptionVerifier, EncryptionError, EncryptionProvider, LedgerError, LedgerGateway,
    ProofSubmitter, VerifierError,
};
