//! ApplicationController - owns the session's view of all applications and
//! drives the submit and decrypt-and-verify workflows.
//!
//! ```text
//!  submit:  validate → encrypt → create_application → confirm → refresh
//!  verify:  short-circuit? → handle → verifier ─┬─→ value → refresh
//!                                               └─ ProofSubmitter → submit_decryption_proof
//! ```
//!
//! Shared state sits behind a `RwLock` that is never held across an
//! awaited collaborator call.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityEntry, ActivityKind, ActivityLog};
use crate::backend::traits::{
    CreateApplication, DecryptionVerifier, EncryptionProvider, LedgerError, LedgerGateway,
    ProofSubmitter, VerifierError,
};
use crate::config::ControllerConfig;
use crate::eligibility::Assessment;
use crate::error::{ControllerError, Result};
use crate::stats::ApplicationStats;
use crate::types::{
    Application, ContractAddress, Identity, SubmitRequest, TxHandle, Verification,
    VerificationStatus,
};

/// Reserved public slot value written with every application.
const RESERVED_SLOT: u64 = 0;

/// Published view of the controller state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub identity: Option<Identity>,
    pub applications: Vec<Application>,
    /// Ids with a verification in flight
    pub verifying: Vec<String>,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    contract: Option<ContractAddress>,
    applications: Vec<Application>,
    in_flight: HashSet<String>,
    local_decryptions: HashMap<String, u64>,
    /// Bumped on every connect and disconnect
    epoch: u64,
}

impl SessionState {
    /// Results of an operation started in another session are discarded.
    fn ensure_epoch(&self, epoch: u64) -> Result<()> {
        if self.epoch == epoch {
            Ok(())
        } else {
            debug!(started = epoch, current = self.epoch, "Session ended, discarding result");
            Err(ControllerError::NotAuthenticated)
        }
    }

    fn find(&self, id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }

    /// Replace the application list, keeping known verifications.
    fn merge(&mut self, fetched: Vec<Application>) {
        let known: HashMap<&str, u64> = self
            .applications
            .iter()
            .filter_map(|a| a.verification.clear_income().map(|v| (a.id.as_str(), v)))
            .collect();

        let merged: Vec<Application> = fetched
            .into_iter()
            .map(|mut app| {
                if let Some(&known_income) = known.get(app.id.as_str()) {
                    match app.verification {
                        Verification::Unverified => {
                            warn!(
                                id = %app.id,
                                "Ledger reported a verified application as unverified, keeping verified state"
                            );
                        }
                        Verification::Verified { clear_income } if clear_income != known_income => {
                            error!(
                                id = %app.id,
                                known = known_income,
                                reported = clear_income,
                                "Ledger reported a different verified income, keeping the first value"
                            );
                        }
                        Verification::Verified { .. } => {}
                    }
                    app.verification = Verification::Verified {
                        clear_income: known_income,
                    };
                }
                app
            })
            .collect();

        self.applications = merged;
        self.drop_settled_decryptions();
    }

    fn upsert(&mut self, app: Application) {
        match self.applications.iter_mut().find(|a| a.id == app.id) {
            Some(existing) => {
                if !existing.is_verified() {
                    *existing = app;
                }
            }
            None => self.applications.push(app),
        }
        self.drop_settled_decryptions();
    }

    /// Record a verification observed on the ledger.
    fn mark_verified(&mut self, id: &str, clear_income: u64) {
        if let Some(app) = self.applications.iter_mut().find(|a| a.id == id) {
            if !app.is_verified() {
                app.verification = Verification::Verified { clear_income };
            }
        }
        self.local_decryptions.remove(id);
    }

    /// Local decryptions are only kept for still-unverified applications.
    fn drop_settled_decryptions(&mut self) {
        let applications = &self.applications;
        self.local_decryptions.retain(|id, _| {
            applications
                .iter()
                .any(|a| &a.id == id && !a.is_verified())
        });
    }

    fn view(&self, app: &Application) -> Application {
        let mut app = app.clone();
        app.locally_decrypted_income = self.local_decryptions.get(&app.id).copied();
        app
    }

    fn status(&self, id: &str) -> Option<VerificationStatus> {
        let app = self.find(id)?;
        Some(match app.verification {
            Verification::Verified { clear_income } => VerificationStatus::Verified(clear_income),
            Verification::Unverified if self.in_flight.contains(id) => {
                VerificationStatus::VerifyingInFlight
            }
            Verification::Unverified => VerificationStatus::Unverified,
        })
    }

    fn snapshot(&self) -> Snapshot {
        let mut verifying: Vec<String> = self.in_flight.iter().cloned().collect();
        verifying.sort();
        Snapshot {
            identity: self.identity.clone(),
            applications: self.applications.iter().map(|a| self.view(a)).collect(),
            verifying,
        }
    }
}

/// Continuation handed to the decryption verifier: submits the decryption
/// proof for one application through the ledger write path.
pub struct LedgerProofSubmitter<'a> {
    ledger: &'a dyn LedgerGateway,
    application_id: &'a str,
}

impl<'a> LedgerProofSubmitter<'a> {
    pub fn new(ledger: &'a dyn LedgerGateway, application_id: &'a str) -> Self {
        Self {
            ledger,
            application_id,
        }
    }
}

#[async_trait]
impl<'a> ProofSubmitter for LedgerProofSubmitter<'a> {
    async fn submit(
        &self,
        clear_values_encoded: Vec<u8>,
        proof: Vec<u8>,
    ) -> std::result::Result<TxHandle, LedgerError> {
        debug!(id = %self.application_id, "Submitting decryption proof");
        self.ledger
            .submit_decryption_proof(self.application_id, clear_values_encoded, proof)
            .await
    }
}

/// Why a verification attempt stopped.
enum VerifyFailure {
    /// Another actor verified first
    AlreadyVerified,
    Failed(String),
}

impl From<LedgerError> for VerifyFailure {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyVerified(_) => VerifyFailure::AlreadyVerified,
            other => VerifyFailure::Failed(other.to_string()),
        }
    }
}

impl From<VerifierError> for VerifyFailure {
    fn from(err: VerifierError) -> Self {
        if err.is_already_verified() {
            VerifyFailure::AlreadyVerified
        } else {
            VerifyFailure::Failed(err.to_string())
        }
    }
}

enum VerifyProgress {
    /// The ledger already held a verified value
    Stored(u64),
    /// The verifier recovered the value in this call
    Decrypted(u64),
}

/// Lifecycle controller for confidential scholarship applications.
pub struct ApplicationController {
    config: ControllerConfig,
    ledger: Arc<dyn LedgerGateway>,
    encryption: Arc<dyn EncryptionProvider>,
    verifier: Arc<dyn DecryptionVerifier>,
    state: Arc<RwLock<SessionState>>,
    activity: ActivityLog,
    updates: watch::Sender<Snapshot>,
}

impl ApplicationController {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        encryption: Arc<dyn EncryptionProvider>,
        verifier: Arc<dyn DecryptionVerifier>,
    ) -> Self {
        Self::with_config(ledger, encryption, verifier, ControllerConfig::default())
    }

    pub fn with_config(
        ledger: Arc<dyn LedgerGateway>,
        encryption: Arc<dyn EncryptionProvider>,
        verifier: Arc<dyn DecryptionVerifier>,
        config: ControllerConfig,
    ) -> Self {
        let (updates, _) = watch::channel(Snapshot::default());
        Self {
            activity: ActivityLog::with_max_entries(config.activity_capacity),
            config,
            ledger,
            encryption,
            verifier,
            state: Arc::new(RwLock::new(SessionState::default())),
            updates,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // === Session lifecycle ===

    /// Start a session for `identity`.
    ///
    /// Initializes the encryption provider, resolves the contract address
    /// and loads the application list. A failed initial load leaves the
    /// session connected with an empty list.
    pub async fn connect(&self, identity: Identity) -> Result<()> {
        info!(identity = %identity, "Connecting session");

        let epoch = {
            let mut state = self.state.write().await;
            let epoch = state.epoch + 1;
            *state = SessionState {
                identity: Some(identity),
                epoch,
                ..SessionState::default()
            };
            self.activity.clear().await;
            self.publish(&state);
            epoch
        };

        if !self.encryption.is_initialized() {
            self.encryption.initialize().await.map_err(|e| {
                error!(error = %e, "Encryption provider initialization failed");
                ControllerError::from(e)
            })?;
        }

        self.contract().await?;

        if let Err(err) = self.reload(epoch).await {
            warn!(error = %err, "Initial application load failed");
        }

        info!("Session connected");
        Ok(())
    }

    /// End the session and drop all session state.
    ///
    /// Operations still running for the ended session discard their results.
    pub async fn disconnect(&self) {
        {
            let mut state = self.state.write().await;
            let epoch = state.epoch + 1;
            *state = SessionState {
                epoch,
                ..SessionState::default()
            };
            self.activity.clear().await;
            self.publish(&state);
        }
        info!("Session disconnected");
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.identity.clone()
    }

    // === Read path ===

    /// Reload every application from the ledger.
    ///
    /// Records that fail to load are skipped. If the id enumeration itself
    /// fails the previous snapshot is kept.
    pub async fn list_applications(&self) -> Result<Vec<Application>> {
        let (_, epoch) = self.session().await?;
        self.reload(epoch).await
    }

    /// Alias of [`ApplicationController::list_applications`].
    pub async fn refresh(&self) -> Result<Vec<Application>> {
        self.list_applications().await
    }

    pub async fn check_system_availability(&self) -> Result<bool> {
        let available = self
            .ledger
            .is_system_available()
            .await
            .map_err(ControllerError::from_read)?;
        debug!(available, "Availability probe");
        Ok(available)
    }

    async fn reload(&self, epoch: u64) -> Result<Vec<Application>> {
        let ids = self.ledger.get_all_application_ids().await.map_err(|e| {
            warn!(error = %e, "Failed to enumerate applications");
            ControllerError::from_read(e)
        })?;

        let mut fetched = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch_application(&id).await {
                Ok(app) => fetched.push(app),
                Err(err) => {
                    warn!(id = %id, error = %err, "Skipping application that failed to load")
                }
            }
        }

        let mut state = self.state.write().await;
        state.ensure_epoch(epoch)?;
        state.merge(fetched);
        self.publish(&state);
        debug!(count = state.applications.len(), "Application list refreshed");
        Ok(state.applications.iter().map(|a| state.view(a)).collect())
    }

    // === Submission ===

    /// Encrypt the income claim and create a new application on the ledger.
    pub async fn submit_application(&self, request: SubmitRequest) -> Result<Application> {
        let (identity, epoch) = self.session().await?;
        let submission = request.validated()?;
        let contract = self.contract().await?;

        let id = self.generate_id();
        info!(id = %id, applicant = %submission.name, "Submitting application");

        let encrypted = self
            .encryption
            .encrypt(&contract, &identity, submission.income)
            .await
            .map_err(|e| {
                error!(id = %id, error = %e, "Income encryption failed");
                ControllerError::from(e)
            })?;

        let tx = self
            .ledger
            .create_application(
                &identity,
                CreateApplication {
                    id: id.clone(),
                    name: submission.name.clone(),
                    ciphertext: encrypted.ciphertext,
                    proof: encrypted.proof,
                    academic_score: submission.academic_score,
                    reserved_slot: RESERVED_SLOT,
                    tag: self.config.application_tag.clone(),
                },
            )
            .await
            .map_err(|e| {
                error!(id = %id, error = %e, "Application write failed");
                ControllerError::from_write(e)
            })?;

        debug!(id = %id, tx = %tx.tx_hash, "Waiting for confirmation");
        self.ledger.wait_for_confirmation(&tx).await.map_err(|e| {
            error!(id = %id, tx = %tx.tx_hash, error = %e, "Application write not confirmed");
            ControllerError::from_write(e)
        })?;
        info!(id = %id, tx = %tx.tx_hash, "Application confirmed");

        {
            let state = self.state.read().await;
            state.ensure_epoch(epoch)?;
            self.activity
                .record(ActivityKind::Applied {
                    application_id: id.clone(),
                    applicant_name: submission.name,
                })
                .await;
        }

        let listed = match self.reload(epoch).await {
            Ok(apps) => apps.into_iter().find(|a| a.id == id),
            Err(err) => {
                warn!(id = %id, error = %err, "Refresh after submission failed");
                None
            }
        };

        match listed {
            Some(app) => Ok(app),
            None => {
                let app = self
                    .fetch_application(&id)
                    .await
                    .map_err(ControllerError::from_read)?;
                let mut state = self.state.write().await;
                state.ensure_epoch(epoch)?;
                state.upsert(app.clone());
                self.publish(&state);
                Ok(app)
            }
        }
    }

    // === Decryption and verification ===

    /// Decrypt an application's income and record the verified value on the
    /// ledger.
    ///
    /// Already-verified applications return their stored value without any
    /// verifier or write call. If another actor verifies concurrently the
    /// stored value is returned. When the proof has not been confirmed by the
    /// time the list is refreshed, the value is kept as the application's
    /// provisional local decryption. If the session ends while the
    /// verification runs, the result is discarded and `NotAuthenticated` is
    /// returned.
    pub async fn decrypt_and_verify(&self, application_id: &str) -> Result<u64> {
        let (identity, epoch) = {
            let mut state = self.state.write().await;
            let identity = state
                .identity
                .clone()
                .ok_or(ControllerError::NotAuthenticated)?;
            let app = state.find(application_id).ok_or_else(|| {
                ControllerError::ApplicationNotFound(format!(
                    "no application with id '{}' in the current list",
                    application_id
                ))
            })?;

            if let Verification::Verified { clear_income } = app.verification {
                debug!(id = %application_id, "Already verified, returning stored value");
                return Ok(clear_income);
            }

            if !state.in_flight.insert(application_id.to_string()) {
                return Err(ControllerError::VerificationInFlight(application_id.to_string()));
            }
            self.publish(&state);
            (identity, state.epoch)
        };

        info!(id = %application_id, requester = %identity, "Starting decryption");
        let attempt = self.attempt_verification(application_id).await;

        {
            let mut state = self.state.write().await;
            if let Err(err) = state.ensure_epoch(epoch) {
                warn!(id = %application_id, "Session ended during verification, discarding result");
                return Err(err);
            }
            state.in_flight.remove(application_id);
            self.publish(&state);
        }

        match attempt {
            Ok(VerifyProgress::Stored(clear_income)) => {
                debug!(id = %application_id, "Ledger already holds a verified value");
                let mut state = self.state.write().await;
                state.ensure_epoch(epoch)?;
                state.mark_verified(application_id, clear_income);
                self.publish(&state);
                Ok(clear_income)
            }
            Ok(VerifyProgress::Decrypted(clear_income)) => {
                self.finish_decryption(epoch, application_id, clear_income).await?;
                Ok(clear_income)
            }
            Err(VerifyFailure::AlreadyVerified) => {
                info!(id = %application_id, "Application was verified concurrently");
                self.stored_value_after_race(epoch, application_id).await
            }
            Err(VerifyFailure::Failed(reason)) => {
                error!(id = %application_id, error = %reason, "Decryption failed");
                Err(ControllerError::DecryptionFailed(reason))
            }
        }
    }

    async fn attempt_verification(
        &self,
        application_id: &str,
    ) -> std::result::Result<VerifyProgress, VerifyFailure> {
        let record = self.ledger.get_application_record(application_id).await?;
        if record.is_verified {
            return Ok(VerifyProgress::Stored(record.decrypted_value));
        }

        let handle = self.ledger.get_encrypted_income_handle(application_id).await?;
        let contract = self
            .contract()
            .await
            .map_err(|e| VerifyFailure::Failed(e.to_string()))?;

        let submitter = LedgerProofSubmitter::new(self.ledger.as_ref(), application_id);
        let outcome = self
            .verifier
            .verify_decryption(std::slice::from_ref(&handle), &contract, &submitter)
            .await?;

        outcome
            .value_for(&handle)
            .map(VerifyProgress::Decrypted)
            .ok_or_else(|| {
                VerifyFailure::Failed(format!("verifier returned no value for handle {}", handle))
            })
    }

    async fn finish_decryption(
        &self,
        epoch: u64,
        application_id: &str,
        clear_income: u64,
    ) -> Result<()> {
        if let Err(err) = self.reload(epoch).await {
            warn!(id = %application_id, error = %err, "Refresh after decryption failed");
        }

        let mut state = self.state.write().await;
        state.ensure_epoch(epoch)?;
        let confirmed = state.find(application_id).map(|a| a.is_verified()).unwrap_or(false);
        if confirmed {
            info!(id = %application_id, "Income verified on ledger");
        } else {
            info!(
                id = %application_id,
                "Verification not yet confirmed, keeping provisional value"
            );
            state
                .local_decryptions
                .insert(application_id.to_string(), clear_income);
            self.publish(&state);
        }

        self.activity
            .record(ActivityKind::Decrypted {
                application_id: application_id.to_string(),
                clear_income,
            })
            .await;
        Ok(())
    }

    async fn stored_value_after_race(&self, epoch: u64, application_id: &str) -> Result<u64> {
        if let Err(err) = self.reload(epoch).await {
            warn!(
                id = %application_id,
                error = %err,
                "Refresh after concurrent verification failed"
            );
        }

        if let Some(clear_income) = self
            .state
            .read()
            .await
            .find(application_id)
            .and_then(|a| a.verification.clear_income())
        {
            return Ok(clear_income);
        }

        let record = self
            .ledger
            .get_application_record(application_id)
            .await
            .map_err(|e| ControllerError::DecryptionFailed(e.to_string()))?;
        if !record.is_verified {
            return Err(ControllerError::DecryptionFailed(format!(
                "ledger reported application {} as already verified but holds no verified value",
                application_id
            )));
        }

        let mut state = self.state.write().await;
        state.ensure_epoch(epoch)?;
        state.mark_verified(application_id, record.decrypted_value);
        self.publish(&state);
        Ok(record.decrypted_value)
    }

    // === Detail view ===

    /// Current view of one application.
    pub async fn open_detail(&self, application_id: &str) -> Option<Application> {
        let state = self.state.read().await;
        state.find(application_id).map(|a| state.view(a))
    }

    /// Forget the provisional decryption shown in the detail view.
    pub async fn close_detail(&self, application_id: &str) {
        let mut state = self.state.write().await;
        if state.local_decryptions.remove(application_id).is_some() {
            self.publish(&state);
        }
    }

    pub async fn verification_status(&self, application_id: &str) -> Option<VerificationStatus> {
        self.state.read().await.status(application_id)
    }

    /// Eligibility of one application under the configured policy, using its
    /// provisional decryption when unverified.
    pub async fn assess(&self, application_id: &str) -> Option<Assessment> {
        let state = self.state.read().await;
        let app = state.find(application_id)?;
        let provisional = state.local_decryptions.get(application_id).copied();
        Some(self.config.eligibility.assess(app, provisional))
    }

    // === Observation ===

    pub fn snapshot(&self) -> Snapshot {
        self.updates.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    /// Newest `limit` activity entries.
    pub async fn activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.activity.recent(limit).await
    }

    /// Statistics relative to `now` (seconds since epoch).
    pub async fn stats(&self, now: u64) -> ApplicationStats {
        let state = self.state.read().await;
        ApplicationStats::compute(&state.applications, now)
    }

    // === Private Implementation ===

    /// Active identity and the epoch of its session.
    async fn session(&self) -> Result<(Identity, u64)> {
        let state = self.state.read().await;
        let identity = state
            .identity
            .clone()
            .ok_or(ControllerError::NotAuthenticated)?;
        Ok((identity, state.epoch))
    }

    /// Contract address, resolved once per session.
    async fn contract(&self) -> Result<ContractAddress> {
        if let Some(contract) = self.state.read().await.contract.clone() {
            return Ok(contract);
        }

        let contract = self
            .ledger
            .contract_address()
            .await
            .map_err(ControllerError::from_read)?;
        self.state.write().await.contract = Some(contract.clone());
        Ok(contract)
    }

    async fn fetch_application(&self, id: &str) -> std::result::Result<Application, LedgerError> {
        let record = self.ledger.get_application_record(id).await?;
        let handle = self.ledger.get_encrypted_income_handle(id).await?;
        Ok(Application::from_record(id, record, handle))
    }

    fn generate_id(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.config.id_prefix,
            Utc::now().timestamp_millis(),
            &nonce[..12]
        )
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{InMemoryLedger, MockDecryptionVerifier, MockEncryptionProvider};

    struct Harness {
        ledger: Arc<InMemoryLedger>,
        encryption: Arc<MockEncryptionProvider>,
        verifier: Arc<MockDecryptionVerifier>,
        controller: ApplicationController,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(InMemoryLedger::new(ContractAddress::new("0xc0ffee")));
        let encryption = Arc::new(MockEncryptionProvider::new());
        let verifier = Arc::new(MockDecryptionVerifier::new(ledger.clone()));
        let controller =
            ApplicationController::new(ledger.clone(), encryption.clone(), verifier.clone());
        Harness {
            ledger,
            encryption,
            verifier,
            controller,
        }
    }

    #[tokio::test]
    async fn test_operations_require_identity() {
        let h = harness();

        let result = h.controller.list_applications().await;
        assert_eq!(result, Err(ControllerError::NotAuthenticated));

        let result = h.controller.submit_application(SubmitRequest::new("Alice", 1, 8)).await;
        assert_eq!(result, Err(ControllerError::NotAuthenticated));

        let result = h.controller.decrypt_and_verify("scholarship-1").await;
        assert_eq!(result, Err(ControllerError::NotAuthenticated));
        assert_eq!(h.encryption.call_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_initializes_encryption() {
        let h = harness();
        assert!(!h.encryption.is_initialized());

        h.controller.connect(Identity::new("0xa11ce")).await.unwrap();
        assert!(h.encryption.is_initialized());
        assert_eq!(h.controller.identity().await, Some(Identity::new("0xa11ce")));
    }

    #[tokio::test]
    async fn test_connect_reports_initialize_failure() {
        let h = harness();
        h.encryption.set_initialize_failing(true);

        let result = h.controller.connect(Identity::new("0xa11ce")).await;
        assert!(matches!(result, Err(ControllerError::EncryptionFailed(_))));
        // Identity is kept so the caller can retry
        assert!(h.controller.identity().await.is_some());
    }

    #[tokio::test]
    async fn test_verification_publishes_updates() {
        let h = harness();
        h.controller.connect(Identity::new("0xa11ce")).await.unwrap();
        let app = h
            .controller
            .submit_application(SubmitRequest::new("Alice", 40_000, 8))
            .await
            .unwrap();

        let mut updates = h.controller.subscribe();
        updates.borrow_and_update();

        h.controller.decrypt_and_verify(&app.id).await.unwrap();

        assert!(updates.has_changed().unwrap());
        assert_eq!(
            h.controller.verification_status(&app.id).await,
            Some(VerificationStatus::Verified(40_000))
        );
        assert!(h.controller.snapshot().verifying.is_empty());
    }

    #[tokio::test]
    async fn test_signer_rejection() {
        let h = harness();
        h.controller.connect(Identity::new("0xa11ce")).await.unwrap();
        h.ledger.reject_next_write();

        let result = h.controller.submit_application(SubmitRequest::new("Alice", 40_000, 8)).await;
        assert!(matches!(result, Err(ControllerError::SubmissionRejected(_))));
        assert!(h.controller.snapshot().applications.is_empty());
        assert!(h.controller.activity(5).await.is_empty());
    }

    #[tokio::test]
    async fn test_verifier_failure_leaves_state_unverified() {
        let h = harness();
        h.controller.connect(Identity::new("0xa11ce")).await.unwrap();
        let app = h
            .controller
            .submit_application(SubmitRequest::new("Alice", 40_000, 8))
            .await
            .unwrap();

        h.verifier.set_available(false);
        let result = h.controller.decrypt_and_verify(&app.id).await;
        assert!(matches!(result, Err(ControllerError::DecryptionFailed(_))));
        assert_eq!(
            h.controller.verification_status(&app.id).await,
            Some(VerificationStatus::Unverified)
        );
        assert_eq!(h.ledger.proof_calls(), 0);
    }

    #[tokio::test]
    async fn test_close_detail_clears_provisional_value() {
        let h = harness();
        h.controller.connect(Identity::new("0xa11ce")).await.unwrap();
        let app = h
            .controller
            .submit_application(SubmitRequest::new("Alice", 40_000, 8))
            .await
            .unwrap();

        h.verifier.set_await_confirmation(false);
        assert_eq!(h.controller.decrypt_and_verify(&app.id).await, Ok(40_000));

        let detail = h.controller.open_detail(&app.id).await.unwrap();
        assert_eq!(detail.locally_decrypted_income, Some(40_000));
        assert!(!h.controller.assess(&app.id).await.unwrap().is_authoritative());

        h.controller.close_detail(&app.id).await;
        let detail = h.controller.open_detail(&app.id).await.unwrap();
        assert_eq!(detail.locally_decrypted_income, None);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let h = harness();
        let a = h.controller.generate_id();
        let b = h.controller.generate_id();
        assert_ne!(a, b);
        assert!(a.starts_with("scholarship-"));
    }
}
