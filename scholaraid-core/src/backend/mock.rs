//! In-memory collaborators for testing and simulation.
//!
//! `InMemoryLedger` plays the application contract, `MockEncryptionProvider`
//! stands in for the FHE runtime and `MockDecryptionVerifier` for the
//! decryption relayer. The "ciphertexts" are masked, not encrypted.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::traits::*;
use crate::types::{
    ApplicationRecord, CiphertextHandle, ContractAddress, EncryptedInput, Identity, TxHandle,
};

const CIPHERTEXT_TAG: &[u8] = b"mock-fhe:";
const MASK_DOMAIN: &[u8] = b"scholaraid-mock-fhe";

fn sha256(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn mask_for(contract: &ContractAddress) -> [u8; 8] {
    let digest = sha256(&[MASK_DOMAIN, contract.as_str().as_bytes()]);
    let mut mask = [0u8; 8];
    mask.copy_from_slice(&digest[..8]);
    mask
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Correctness proof the mock provider attaches to a ciphertext.
pub fn input_proof(contract: &ContractAddress, requester: &Identity, ciphertext: &[u8]) -> Vec<u8> {
    sha256(&[contract.as_str().as_bytes(), requester.as_str().as_bytes(), ciphertext])
}

/// Proof the mock verifier attaches to a decryption.
pub fn decryption_proof(handles: &[CiphertextHandle], clear_values_encoded: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for handle in handles {
        hasher.update(handle.as_str().as_bytes());
    }
    hasher.update(clear_values_encoded);
    hasher.finalize().to_vec()
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
struct LedgerEntry {
    seq: u64,
    record: ApplicationRecord,
    ciphertext: Vec<u8>,
    handle: CiphertextHandle,
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Create { id: String, entry: LedgerEntry },
    Verify { id: String, clear_income: u64 },
}

/// Contract simulation backed by concurrent maps.
///
/// Writes stay pending until `wait_for_confirmation` is called for their
/// transaction (or `confirm_all`).
pub struct InMemoryLedger {
    contract: ContractAddress,
    entries: DashMap<String, LedgerEntry>,
    pending: DashMap<String, PendingWrite>,
    confirmed: DashSet<String>,
    failing_records: DashSet<String>,
    stale_records: DashMap<String, ApplicationRecord>,
    reachable: AtomicBool,
    available: AtomicBool,
    reject_next_write: AtomicBool,
    next_seq: AtomicU64,
    create_calls: AtomicU32,
    proof_calls: AtomicU32,
}

impl InMemoryLedger {
    pub fn new(contract: ContractAddress) -> Self {
        Self {
            contract,
            entries: DashMap::new(),
            pending: DashMap::new(),
            confirmed: DashSet::new(),
            failing_records: DashSet::new(),
            stale_records: DashMap::new(),
            reachable: AtomicBool::new(true),
            available: AtomicBool::new(true),
            reject_next_write: AtomicBool::new(false),
            next_seq: AtomicU64::new(1),
            create_calls: AtomicU32::new(0),
            proof_calls: AtomicU32::new(0),
        }
    }

    /// Make every read fail with `Unavailable`.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Value reported by the availability probe.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make reads of one record fail.
    pub fn fail_record(&self, id: impl Into<String>) {
        self.failing_records.insert(id.into());
    }

    /// Undo [`InMemoryLedger::fail_record`].
    pub fn heal_record(&self, id: &str) {
        self.failing_records.remove(id);
    }

    /// Serve a fixed record for `id`, regardless of the stored state.
    pub fn serve_stale_record(&self, id: impl Into<String>, record: ApplicationRecord) {
        self.stale_records.insert(id.into(), record);
    }

    /// The signer declines the next write.
    pub fn reject_next_write(&self) {
        self.reject_next_write.store(true, Ordering::SeqCst);
    }

    /// Seed a confirmed application directly, bypassing the write path.
    pub fn seed(
        &self,
        id: impl Into<String>,
        record: ApplicationRecord,
        ciphertext: Vec<u8>,
    ) -> CiphertextHandle {
        let id = id.into();
        let handle = self.derive_handle(&id, &ciphertext);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            id,
            LedgerEntry {
                seq,
                record,
                ciphertext,
                handle: handle.clone(),
            },
        );
        handle
    }

    /// Another actor verifies the application holding `handle`.
    pub fn verify_by_handle(&self, handle: &CiphertextHandle, clear_income: u64) -> bool {
        for mut entry in self.entries.iter_mut() {
            if &entry.handle == handle {
                entry.record.is_verified = true;
                entry.record.decrypted_value = clear_income;
                return true;
            }
        }
        false
    }

    /// Stored ciphertext for a handle.
    pub fn ciphertext_for(&self, handle: &CiphertextHandle) -> Option<Vec<u8>> {
        self.entries
            .iter()
            .find(|entry| &entry.handle == handle)
            .map(|entry| entry.ciphertext.clone())
    }

    /// Confirm every pending transaction.
    pub fn confirm_all(&self) -> Result<(), LedgerError> {
        let hashes: Vec<String> = self.pending.iter().map(|p| p.key().clone()).collect();
        for hash in hashes {
            self.confirm(&hash)?;
        }
        Ok(())
    }

    /// Writes not yet confirmed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn proof_calls(&self) -> u32 {
        self.proof_calls.load(Ordering::SeqCst)
    }

    fn derive_handle(&self, id: &str, ciphertext: &[u8]) -> CiphertextHandle {
        let digest = sha256(&[self.contract.as_str().as_bytes(), id.as_bytes(), ciphertext]);
        CiphertextHandle::new(format!("0x{}", hex::encode(digest)))
    }

    fn ensure_reachable(&self) -> Result<(), LedgerError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("ledger endpoint unreachable".into()))
        }
    }

    fn next_tx(&self, kind: &str, id: &str) -> TxHandle {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let digest = sha256(&[kind.as_bytes(), id.as_bytes(), &seq.to_be_bytes()]);
        TxHandle::new(format!("0x{}", hex::encode(digest)))
    }

    fn confirm(&self, tx_hash: &str) -> Result<(), LedgerError> {
        let Some((_, write)) = self.pending.remove(tx_hash) else {
            return if self.confirmed.contains(tx_hash) {
                Ok(())
            } else {
                Err(LedgerError::Transport(format!("unknown transaction {}", tx_hash)))
            };
        };

        match write {
            PendingWrite::Create { id, entry } => {
                if self.entries.contains_key(&id) {
                    return Err(LedgerError::Contract(format!("application {} already exists", id)));
                }
                self.entries.insert(id, entry);
            }
            PendingWrite::Verify { id, clear_income } => {
                let mut entry = self
                    .entries
                    .get_mut(&id)
                    .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
                if entry.record.is_verified {
                    return Err(LedgerError::AlreadyVerified(id));
                }
                entry.record.is_verified = true;
                entry.record.decrypted_value = clear_income;
            }
        }

        self.confirmed.insert(tx_hash.to_string());
        Ok(())
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn contract_address(&self) -> Result<ContractAddress, LedgerError> {
        self.ensure_reachable()?;
        Ok(self.contract.clone())
    }

    async fn get_all_application_ids(&self) -> Result<Vec<String>, LedgerError> {
        self.ensure_reachable()?;
        let mut ids: Vec<(u64, String)> = self
            .entries
            .iter()
            .map(|entry| (entry.seq, entry.key().clone()))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn get_application_record(&self, id: &str) -> Result<ApplicationRecord, LedgerError> {
        self.ensure_reachable()?;
        if self.failing_records.contains(id) {
            return Err(LedgerError::Transport(format!("failed to decode record {}", id)));
        }
        if let Some(stale) = self.stale_records.get(id) {
            return Ok(stale.clone());
        }
        self.entries
            .get(id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    async fn get_encrypted_income_handle(&self, id: &str) -> Result<CiphertextHandle, LedgerError> {
        self.ensure_reachable()?;
        self.entries
            .get(id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    async fn is_system_available(&self) -> Result<bool, LedgerError> {
        self.ensure_reachable()?;
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn create_application(
        &self,
        requester: &Identity,
        request: CreateApplication,
    ) -> Result<TxHandle, LedgerError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject_next_write.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::SignerRejected("user rejected transaction".into()));
        }
        self.ensure_reachable()?;

        if self.entries.contains_key(&request.id) {
            return Err(LedgerError::Contract(format!("application {} already exists", request.id)));
        }
        if input_proof(&self.contract, requester, &request.ciphertext) != request.proof {
            return Err(LedgerError::Contract("invalid input proof".into()));
        }

        let handle = self.derive_handle(&request.id, &request.ciphertext);
        let entry = LedgerEntry {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            record: ApplicationRecord {
                name: request.name,
                creator: requester.clone(),
                timestamp: unix_now(),
                academic_score: request.academic_score,
                reserved_slot: request.reserved_slot,
                is_verified: false,
                decrypted_value: 0,
            },
            ciphertext: request.ciphertext,
            handle,
        };

        let tx = self.next_tx("create", &request.id);
        debug!(id = %request.id, tag = %request.tag, tx = %tx.tx_hash, "Queued application write");
        self.pending.insert(
            tx.tx_hash.clone(),
            PendingWrite::Create {
                id: request.id,
                entry,
            },
        );
        Ok(tx)
    }

    async fn submit_decryption_proof(
        &self,
        id: &str,
        clear_values_encoded: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<TxHandle, LedgerError> {
        self.proof_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject_next_write.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::SignerRejected("user rejected transaction".into()));
        }
        self.ensure_reachable()?;

        let handle = {
            let entry = self
                .entries
                .get(id)
                .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
            if entry.record.is_verified {
                return Err(LedgerError::AlreadyVerified(id.to_string()));
            }
            entry.handle.clone()
        };

        if decryption_proof(std::slice::from_ref(&handle), &clear_values_encoded) != proof {
            return Err(LedgerError::Contract("invalid decryption proof".into()));
        }
        let clear_income = match decode_clear_values(&clear_values_encoded).as_deref() {
            Some([value]) => *value,
            _ => return Err(LedgerError::Contract("expected exactly one clear value".into())),
        };

        let tx = self.next_tx("verify", id);
        self.pending.insert(
            tx.tx_hash.clone(),
            PendingWrite::Verify {
                id: id.to_string(),
                clear_income,
            },
        );
        Ok(tx)
    }

    async fn wait_for_confirmation(&self, tx: &TxHandle) -> Result<(), LedgerError> {
        self.confirm(&tx.tx_hash)
    }
}

// ============================================================================
// Encryption provider
// ============================================================================

/// Encryption provider producing masked, reversible ciphertexts.
pub struct MockEncryptionProvider {
    initialized: AtomicBool,
    fail_initialize: AtomicBool,
    fail_encrypt: AtomicBool,
    call_count: AtomicU32,
}

impl MockEncryptionProvider {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            fail_initialize: AtomicBool::new(false),
            fail_encrypt: AtomicBool::new(false),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_encrypt.store(failing, Ordering::SeqCst);
    }

    pub fn set_initialize_failing(&self, failing: bool) {
        self.fail_initialize.store(failing, Ordering::SeqCst);
    }

    /// Number of `encrypt` calls.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Recover the plaintext of a ciphertext produced for `contract`.
    pub fn reveal(contract: &ContractAddress, ciphertext: &[u8]) -> Option<u64> {
        let body = ciphertext.strip_prefix(CIPHERTEXT_TAG)?;
        if body.len() != 8 {
            return None;
        }
        let mask = mask_for(contract);
        let mut bytes = [0u8; 8];
        for (i, b) in body.iter().enumerate() {
            bytes[i] = b ^ mask[i];
        }
        Some(u64::from_be_bytes(bytes))
    }

    /// Ciphertext for `plaintext` under `contract`.
    pub fn seal(contract: &ContractAddress, plaintext: u64) -> Vec<u8> {
        let mask = mask_for(contract);
        let mut out = CIPHERTEXT_TAG.to_vec();
        out.extend(plaintext.to_be_bytes().iter().zip(mask.iter()).map(|(b, m)| b ^ m));
        out
    }
}

impl Default for MockEncryptionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EncryptionProvider for MockEncryptionProvider {
    async fn initialize(&self) -> Result<(), EncryptionError> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(EncryptionError::Provider("FHE runtime failed to load".into()));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn encrypt(
        &self,
        contract: &ContractAddress,
        requester: &Identity,
        plaintext: u64,
    ) -> Result<EncryptedInput, EncryptionError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if !self.is_initialized() {
            return Err(EncryptionError::NotInitialized);
        }
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(EncryptionError::Provider("relayer returned 503".into()));
        }

        let ciphertext = Self::seal(contract, plaintext);
        let proof = input_proof(contract, requester, &ciphertext);
        Ok(EncryptedInput { ciphertext, proof })
    }
}

// ============================================================================
// Decryption verifier
// ============================================================================

/// Decryption verifier that reads ciphertexts straight from an
/// [`InMemoryLedger`].
pub struct MockDecryptionVerifier {
    ledger: Arc<InMemoryLedger>,
    available: AtomicBool,
    await_confirmation: AtomicBool,
    competing_verification: AtomicBool,
    call_count: AtomicU32,
}

impl MockDecryptionVerifier {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            ledger,
            available: AtomicBool::new(true),
            await_confirmation: AtomicBool::new(true),
            competing_verification: AtomicBool::new(false),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether the verifier waits for the proof transaction to confirm.
    pub fn set_await_confirmation(&self, await_confirmation: bool) {
        self.await_confirmation.store(await_confirmation, Ordering::SeqCst);
    }

    /// Let another actor verify the application right before the proof
    /// is submitted.
    pub fn set_competing_verification(&self, competing: bool) {
        self.competing_verification.store(competing, Ordering::SeqCst);
    }

    /// Number of `verify_decryption` calls.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecryptionVerifier for MockDecryptionVerifier {
    async fn verify_decryption(
        &self,
        handles: &[CiphertextHandle],
        contract: &ContractAddress,
        on_proof_ready: &dyn ProofSubmitter,
    ) -> Result<DecryptionOutcome, VerifierError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(VerifierError::Unavailable("decryption relayer offline".into()));
        }

        let mut outcome = DecryptionOutcome::default();
        let mut values = Vec::with_capacity(handles.len());
        for handle in handles {
            let ciphertext = self
                .ledger
                .ciphertext_for(handle)
                .ok_or_else(|| VerifierError::Failed(format!("unknown handle {}", handle)))?;
            let value = MockEncryptionProvider::reveal(contract, &ciphertext)
                .ok_or_else(|| {
                    VerifierError::Failed(format!("malformed ciphertext for {}", handle))
                })?;
            values.push(value);
            outcome.clear_values.insert(handle.clone(), value);
        }

        if self.competing_verification.load(Ordering::SeqCst) {
            for (handle, value) in handles.iter().zip(&values) {
                self.ledger.verify_by_handle(handle, *value);
            }
        }

        let encoded = encode_clear_values(&values);
        let proof = decryption_proof(handles, &encoded);
        let tx = on_proof_ready.submit(encoded, proof).await?;

        if self.await_confirmation.load(Ordering::SeqCst) {
            self.ledger.wait_for_confirmation(&tx).await?;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> ContractAddress {
        ContractAddress::new("0x5c4014b1aA1a6d8F01D1e1f8C6a5D7B1C2e3F4a5")
    }

    #[test]
    fn test_seal_reveal() {
        let ciphertext = MockEncryptionProvider::seal(&contract(), 40_000);
        assert_ne!(&ciphertext[CIPHERTEXT_TAG.len()..], &40_000u64.to_be_bytes());
        assert_eq!(MockEncryptionProvider::reveal(&contract(), &ciphertext), Some(40_000));
        assert_eq!(MockEncryptionProvider::reveal(&contract(), b"garbage"), None);
    }

    #[tokio::test]
    async fn test_encrypt_requires_initialize() {
        let provider = MockEncryptionProvider::new();
        let result = provider.encrypt(&contract(), &Identity::new("0xa"), 1).await;
        assert_eq!(result, Err(EncryptionError::NotInitialized));

        provider.initialize().await.unwrap();
        assert!(provider.encrypt(&contract(), &Identity::new("0xa"), 1).await.is_ok());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_create_is_pending_until_confirmed() {
        let ledger = InMemoryLedger::new(contract());
        let requester = Identity::new("0xa11ce");
        let ciphertext = MockEncryptionProvider::seal(&contract(), 10);
        let proof = input_proof(&contract(), &requester, &ciphertext);

        let tx = ledger
            .create_application(
                &requester,
                CreateApplication {
                    id: "scholarship-1".into(),
                    name: "Alice".into(),
                    ciphertext,
                    proof,
                    academic_score: 8,
                    reserved_slot: 0,
                    tag: "Scholarship Application".into(),
                },
            )
            .await
            .unwrap();

        assert!(ledger.get_all_application_ids().await.unwrap().is_empty());
        ledger.wait_for_confirmation(&tx).await.unwrap();
        assert_eq!(ledger.get_all_application_ids().await.unwrap(), vec!["scholarship-1"]);

        // Confirming twice is harmless
        ledger.wait_for_confirmation(&tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_rejects_forged_proof() {
        let ledger = InMemoryLedger::new(contract());
        let result = ledger
            .create_application(
                &Identity::new("0xa11ce"),
                CreateApplication {
                    id: "scholarship-1".into(),
                    name: "Alice".into(),
                    ciphertext: MockEncryptionProvider::seal(&contract(), 10),
                    proof: vec![0; 32],
                    academic_score: 8,
                    reserved_slot: 0,
                    tag: "Scholarship Application".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Contract(_))));
    }

    #[tokio::test]
    async fn test_proof_after_verification_is_rejected() {
        let ledger = InMemoryLedger::new(contract());
        let record = ApplicationRecord {
            name: "Bob".into(),
            creator: Identity::new("0xb0b"),
            timestamp: 1,
            academic_score: 9,
            reserved_slot: 0,
            is_verified: false,
            decrypted_value: 0,
        };
        let handle =
            ledger.seed("scholarship-2", record, MockEncryptionProvider::seal(&contract(), 5));
        assert!(ledger.verify_by_handle(&handle, 5));

        let encoded = encode_clear_values(&[5]);
        let proof = decryption_proof(std::slice::from_ref(&handle), &encoded);
        let result = ledger.submit_decryption_proof("scholarship-2", encoded, proof).await;
        assert_eq!(result, Err(LedgerError::AlreadyVerified("scholarship-2".into())));
    }
}
