//! Shared test fixtures: a scripted oracle, a transparent encryptor, and an
//! engine harness over a temp directory.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cipherlens::cipher::{Cleartext, EncryptedValue, Encryptor};
use cipherlens::lifecycle::{LifecycleEngine, OwnerId};
use cipherlens::observability::{AuditLog, AuditRecord};
use cipherlens::oracle::{
    attestation_digest, DecryptionOracle, DecryptionProof, OracleError, OracleResult,
    RequestHandle, RequestKind,
};
use cipherlens::store::RecordStore;
use tempfile::TempDir;

/// Encryptor whose "ciphertext" is the JSON encoding of the cleartext, so
/// the scripted oracle can decrypt without key material.
pub struct PlainEncryptor;

impl Encryptor for PlainEncryptor {
    fn encrypt_scalar(&self, value: f64) -> EncryptedValue {
        let bytes = serde_json::to_vec(&Cleartext::Scalar(value)).unwrap();
        EncryptedValue::scalar(bytes)
    }

    fn encrypt_vector(&self, values: &[f64]) -> EncryptedValue {
        let bytes = serde_json::to_vec(&Cleartext::Vector(values.to_vec())).unwrap();
        EncryptedValue::vector(bytes, values.len())
    }
}

/// One recorded decryption request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub handle: RequestHandle,
    pub kind: RequestKind,
    pub batch: Vec<EncryptedValue>,
}

/// Deterministic oracle double.
///
/// Hands out sequential handles, records every request, and can produce the
/// matching cleartext batch and a valid attestation proof on demand. Proof
/// verification recomputes the canonical digest; flipping `reject_proofs`
/// simulates a verifier that refuses everything.
pub struct ScriptedOracle {
    next_handle: AtomicU64,
    requests: Mutex<Vec<RecordedRequest>>,
    reject_proofs: AtomicBool,
    fail_requests: AtomicBool,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
            reject_proofs: AtomicBool::new(false),
            fail_requests: AtomicBool::new(false),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, handle: RequestHandle) -> RecordedRequest {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.handle == handle)
            .cloned()
            .expect("no request recorded for handle")
    }

    pub fn set_reject_proofs(&self, reject: bool) {
        self.reject_proofs.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Decrypts a recorded request's batch the way the real oracle would.
    pub fn decrypt(&self, handle: RequestHandle) -> Vec<Cleartext> {
        self.request(handle)
            .batch
            .iter()
            .map(|value| serde_json::from_slice(value.as_bytes()).unwrap())
            .collect()
    }

    /// Produces a proof the verifier accepts for this exact delivery.
    pub fn attest(
        &self,
        handle: RequestHandle,
        kind: RequestKind,
        cleartext: &[Cleartext],
    ) -> DecryptionProof {
        DecryptionProof::from_bytes(attestation_digest(handle, kind, cleartext).to_vec())
    }

    /// Decrypt-and-attest for a recorded request: the well-behaved delivery.
    pub fn respond(&self, handle: RequestHandle) -> (Vec<Cleartext>, DecryptionProof) {
        let kind = self.request(handle).kind;
        let cleartext = self.decrypt(handle);
        let proof = self.attest(handle, kind, &cleartext);
        (cleartext, proof)
    }
}

impl DecryptionOracle for ScriptedOracle {
    fn request_decryption(
        &self,
        batch: &[EncryptedValue],
        purpose: RequestKind,
    ) -> OracleResult<RequestHandle> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("scripted outage".to_string()));
        }
        let handle = RequestHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.requests.lock().unwrap().push(RecordedRequest {
            handle,
            kind: purpose,
            batch: batch.to_vec(),
        });
        Ok(handle)
    }

    fn verify_proof(
        &self,
        handle: RequestHandle,
        cleartext: &[Cleartext],
        proof: &DecryptionProof,
    ) -> bool {
        if self.reject_proofs.load(Ordering::SeqCst) {
            return false;
        }
        let recorded = self.requests.lock().unwrap();
        let Some(request) = recorded.iter().find(|r| r.handle == handle) else {
            return false;
        };
        let expected = attestation_digest(handle, request.kind, cleartext);
        proof.as_bytes() == expected
    }
}

/// Engine plus collaborators over a temp directory.
pub struct Harness {
    pub engine: LifecycleEngine,
    pub oracle: Arc<ScriptedOracle>,
    pub store: Arc<RecordStore>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Self::over(dir)
    }

    /// Builds a harness over an existing data directory (reopen scenarios).
    pub fn over(dir: TempDir) -> Self {
        let store = Arc::new(RecordStore::open(dir.path()).unwrap());
        let oracle = Arc::new(ScriptedOracle::new());
        let audit = AuditLog::open(dir.path()).unwrap();
        let engine = LifecycleEngine::open(
            store.clone(),
            oracle.clone(),
            Arc::new(PlainEncryptor),
            audit,
        );
        Self {
            engine,
            oracle,
            store,
            dir,
        }
    }

    /// Submits a prediction with transparent ciphertexts.
    pub fn submit(&self, owner: &str, inputs: &[f64], output: f64) -> u64 {
        self.engine
            .submit_prediction(
                PlainEncryptor.encrypt_vector(inputs),
                PlainEncryptor.encrypt_scalar(output),
                PlainEncryptor.encrypt_scalar(1.0),
                OwnerId::new(owner),
            )
            .unwrap()
    }

    /// Reads back the audit file.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        AuditLog::open(self.dir.path()).unwrap().read_all().unwrap()
    }
}
