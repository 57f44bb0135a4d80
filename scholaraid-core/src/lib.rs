//! ScholarAid core - confidential scholarship applications
//!
//! Applicants submit an income figure that is encrypted before it reaches
//! the ledger. Anyone can later run a verified decryption that records the
//! cleartext on the ledger, after which eligibility is decided from the
//! public academic score and the verified income.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         ApplicationController           │
//! │   (session state, submit, verify)       │
//! └───────┬──────────────┬──────────────┬───┘
//!         ▼              ▼              ▼
//! ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//! │ Encryption  │ │   Ledger    │ │ Decryption  │
//! │ Provider    │ │   Gateway   │◄┤ Verifier    │
//! └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! The verifier reaches the ledger write path only through the
//! [`ProofSubmitter`] continuation the controller hands it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scholaraid_core::{
//!     ApplicationController, ContractAddress, Identity, InMemoryLedger,
//!     MockDecryptionVerifier, MockEncryptionProvider, SubmitRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(InMemoryLedger::new(ContractAddress::new("0xc0ffee")));
//! let controller = ApplicationController::new(
//!     ledger.clone(),
//!     Arc::new(MockEncryptionProvider::new()),
//!     Arc::new(MockDecryptionVerifier::new(ledger)),
//! );
//!
//! controller.connect(Identity::new("0xa11ce")).await?;
//! let app = controller
//!     .submit_application(SubmitRequest::new("Alice", 40_000, 8))
//!     .await?;
//! let income = controller.decrypt_and_verify(&app.id).await?;
//! assert_eq!(income, 40_000);
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod backend;
pub mod config;
pub mod controller;
pub mod eligibility;
pub mod error;
pub mod stats;
pub mod types;

// Re-export main types for convenience
pub use activity::{ActivityEntry, ActivityKind, ActivityLog};
pub use backend::mock::{InMemoryLedger, MockDecryptionVerifier, MockEncryptionProvider};
pub use backend::traits::{
    DecryptionVerifier, EncryptionProvider, LedgerError, LedgerGateway, ProofSubmitter,
};
pub use config::ControllerConfig;
pub use controller::{ApplicationController, LedgerProofSubmitter, Snapshot};
pub use eligibility::{is_eligible, Assessment, EligibilityPolicy, IncomeBasis};
pub use error::{ControllerError, Result};
pub use stats::ApplicationStats;
pub use types::*;
