//! The lifecycle engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};

use super::derive::{DeriveScores, MagnitudeAttribution};
use super::entities::{
    Explanation, OwnerId, Prediction, RevealedScores, EXPLANATION_KEY_PREFIX,
    PREDICTION_KEY_PREFIX,
};
use super::errors::{LifecycleError, LifecycleResult};
use crate::cipher::{CipherShape, Cleartext, EncryptedValue, Encryptor};
use crate::correlation::{CorrelationEntry, CorrelationTable};
use crate::observability::{
    AuditAction, AuditLog, AuditOutcome, AuditRecord, Logger, Severity,
};
use crate::oracle::{DecryptionOracle, DecryptionProof, RequestHandle, RequestKind};
use crate::store::RecordStore;

/// Outcome of a reveal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealRequest {
    /// A decryption request was issued; the reveal arrives via callback.
    Issued(RequestHandle),
    /// The explanation is already revealed. No oracle call was made and no
    /// state changed; the information is already visible to the owner.
    AlreadyRevealed,
}

/// Why a callback was rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No outstanding correlation entry: stale, forged, or replayed delivery.
    UnknownHandle,
    /// Batch length or element shapes do not match the request.
    ArityMismatch,
    /// The attestation proof was rejected. Security-relevant.
    ProofVerificationFailed,
    /// Applying the transition failed internally.
    Internal,
}

impl DropReason {
    /// Stable string form for audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::UnknownHandle => "UNKNOWN_HANDLE",
            DropReason::ArityMismatch => "ARITY_MISMATCH",
            DropReason::ProofVerificationFailed => "PROOF_VERIFICATION_FAILED",
            DropReason::Internal => "INTERNAL",
        }
    }
}

/// Result of delivering an oracle callback.
///
/// Dropped callbacks are reported here and in the audit log, never raised
/// as errors: the delivery channel is untrusted and a rejection must not
/// disturb unrelated callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A generation callback produced a new explanation.
    ExplanationGenerated {
        prediction_id: u64,
        explanation_id: u64,
    },
    /// A reveal callback made an explanation's scores visible.
    ExplanationRevealed { explanation_id: u64 },
    /// The callback was rejected and no state changed.
    Dropped {
        kind: RequestKind,
        handle: RequestHandle,
        reason: DropReason,
    },
}

/// State machine driving predictions and their derived explanations.
///
/// All methods take `&self` and are safe under arbitrary interleaving of
/// caller requests and oracle callbacks. The correlation table's atomic
/// consume is the sole serialization point on the callback path; no lock is
/// held across an oracle call.
pub struct LifecycleEngine {
    store: Arc<RecordStore>,
    correlation: CorrelationTable,
    oracle: Arc<dyn DecryptionOracle>,
    encryptor: Arc<dyn Encryptor>,
    derivation: Box<dyn DeriveScores>,
    audit: AuditLog,
    next_prediction_id: AtomicU64,
    next_explanation_id: AtomicU64,
}

impl LifecycleEngine {
    /// Builds an engine over an opened store, recovering the monotonic id
    /// counters from the persisted keys.
    pub fn open(
        store: Arc<RecordStore>,
        oracle: Arc<dyn DecryptionOracle>,
        encryptor: Arc<dyn Encryptor>,
        audit: AuditLog,
    ) -> Self {
        let mut max_prediction = 0u64;
        let mut max_explanation = 0u64;
        for key in store.list_keys() {
            if let Some(id) = parse_id(&key, PREDICTION_KEY_PREFIX) {
                max_prediction = max_prediction.max(id);
            } else if let Some(id) = parse_id(&key, EXPLANATION_KEY_PREFIX) {
                max_explanation = max_explanation.max(id);
            }
        }

        Self {
            store,
            correlation: CorrelationTable::new(),
            oracle,
            encryptor,
            derivation: Box::new(MagnitudeAttribution),
            audit,
            next_prediction_id: AtomicU64::new(max_prediction + 1),
            next_explanation_id: AtomicU64::new(max_explanation + 1),
        }
    }

    /// Replaces the score derivation capability.
    pub fn with_derivation(mut self, derivation: Box<dyn DeriveScores>) -> Self {
        self.derivation = derivation;
        self
    }

    /// Persists a new encrypted prediction and returns its id.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidShape`] unless `inputs` is a vector
    /// ciphertext and `output` / `model_ref` are scalars.
    pub fn submit_prediction(
        &self,
        inputs: EncryptedValue,
        output: EncryptedValue,
        model_ref: EncryptedValue,
        owner: OwnerId,
    ) -> LifecycleResult<u64> {
        if !matches!(inputs.shape(), CipherShape::Vector(_)) {
            return Err(LifecycleError::InvalidShape(
                "encrypted inputs must be a vector".to_string(),
            ));
        }
        if output.shape() != CipherShape::Scalar || model_ref.shape() != CipherShape::Scalar {
            return Err(LifecycleError::InvalidShape(
                "encrypted output and model ref must be scalars".to_string(),
            ));
        }

        let id = self.next_prediction_id.fetch_add(1, Ordering::SeqCst);
        let prediction = Prediction {
            id,
            owner,
            encrypted_inputs: inputs,
            encrypted_output: output,
            encrypted_model_ref: model_ref,
            created_at: Utc::now(),
        };
        self.put_entity(&Prediction::key(id), &prediction)?;

        self.record(
            AuditRecord::new(AuditAction::PredictionSubmitted, AuditOutcome::Success)
                .with_subject(id),
        );
        Ok(id)
    }

    /// Loads a prediction.
    pub fn prediction(&self, id: u64) -> LifecycleResult<Prediction> {
        self.load(&Prediction::key(id), "prediction", id)
    }

    /// Loads an explanation.
    pub fn explanation(&self, id: u64) -> LifecycleResult<Explanation> {
        self.load(&Explanation::key(id), "explanation", id)
    }

    /// Asks the oracle to decrypt a prediction's ciphertexts so that its
    /// explanation can be generated.
    ///
    /// No explanation record exists until the callback is applied; the
    /// outstanding request lives only in the correlation table.
    pub fn request_generation(
        &self,
        prediction_id: u64,
        caller: &OwnerId,
    ) -> LifecycleResult<RequestHandle> {
        let prediction = self.prediction(prediction_id)?;
        if prediction.owner != *caller {
            return Err(LifecycleError::NotOwner {
                entity: "prediction",
                id: prediction_id,
                caller: caller.to_string(),
            });
        }

        let batch = [
            prediction.encrypted_inputs,
            prediction.encrypted_output,
            prediction.encrypted_model_ref,
        ];
        self.issue_decryption(RequestKind::Generation, prediction_id, &batch)
    }

    /// Asks the oracle to decrypt an explanation's score ciphertexts.
    ///
    /// Revealing an already-revealed explanation is an idempotent no-op:
    /// `Ok(RevealRequest::AlreadyRevealed)`, no oracle call, no mutation.
    pub fn request_reveal(
        &self,
        explanation_id: u64,
        caller: &OwnerId,
    ) -> LifecycleResult<RevealRequest> {
        let explanation = self.explanation(explanation_id)?;
        if explanation.owner != *caller {
            return Err(LifecycleError::NotOwner {
                entity: "explanation",
                id: explanation_id,
                caller: caller.to_string(),
            });
        }
        if explanation.revealed {
            self.record(
                AuditRecord::new(AuditAction::RevealAlreadyDone, AuditOutcome::Success)
                    .with_subject(explanation_id),
            );
            return Ok(RevealRequest::AlreadyRevealed);
        }

        let batch = [
            explanation.encrypted_shap,
            explanation.encrypted_lime,
            explanation.encrypted_importance,
        ];
        let handle = self.issue_decryption(RequestKind::Reveal, explanation_id, &batch)?;
        Ok(RevealRequest::Issued(handle))
    }

    /// Delivers an oracle callback.
    ///
    /// The single validation pipeline for both purposes: consume the
    /// correlation entry (first delivery wins), check batch arity and
    /// shapes, verify the attestation proof, then apply the transition.
    /// Every rejection is audited and returned as [`CallbackOutcome::Dropped`];
    /// nothing on this path propagates as an error.
    pub fn on_decrypted(
        &self,
        kind: RequestKind,
        handle: RequestHandle,
        cleartext: &[Cleartext],
        proof: &DecryptionProof,
    ) -> CallbackOutcome {
        let entry = match self.correlation.consume(kind, handle) {
            Ok(entry) => entry,
            Err(_) => {
                return self.drop_callback(
                    kind,
                    handle,
                    None,
                    DropReason::UnknownHandle,
                    "no outstanding request for handle",
                );
            }
        };

        let shapes_match = cleartext.len() == entry.expected.len()
            && cleartext
                .iter()
                .zip(entry.expected.iter())
                .all(|(value, shape)| value.matches(*shape));
        if !shapes_match {
            return self.drop_callback(
                kind,
                handle,
                Some(entry.subject_id),
                DropReason::ArityMismatch,
                "cleartext batch does not match requested shapes",
            );
        }

        if !self.oracle.verify_proof(handle, cleartext, proof) {
            return self.drop_callback(
                kind,
                handle,
                Some(entry.subject_id),
                DropReason::ProofVerificationFailed,
                "attestation proof rejected",
            );
        }

        let applied = match kind {
            RequestKind::Generation => self.apply_generation(&entry, cleartext),
            RequestKind::Reveal => self.apply_reveal(&entry, cleartext),
        };
        match applied {
            Ok(outcome) => outcome,
            Err(err) => self.drop_callback(
                kind,
                handle,
                Some(entry.subject_id),
                DropReason::Internal,
                &err.to_string(),
            ),
        }
    }

    /// Evicts correlation entries older than `max_age` and returns how many
    /// were removed. Swept subjects accept a fresh request; the oracle is
    /// never retried automatically.
    pub fn sweep_stale(&self, max_age: Duration) -> usize {
        let swept = self.correlation.sweep_stale(max_age);
        for entry in &swept {
            Logger::log(
                Severity::Warn,
                "correlation_swept",
                &[
                    ("handle", &entry.handle.to_string()),
                    ("kind", entry.kind.as_str()),
                    ("subject_id", &entry.subject_id.to_string()),
                ],
            );
            self.record(
                AuditRecord::new(AuditAction::SweepEvicted, AuditOutcome::Rejected)
                    .with_request(entry.kind, entry.handle)
                    .with_subject(entry.subject_id)
                    .with_detail("no callback within timeout"),
            );
        }
        swept.len()
    }

    /// Number of outstanding decryption requests.
    pub fn outstanding_requests(&self) -> usize {
        self.correlation.outstanding()
    }

    fn issue_decryption(
        &self,
        kind: RequestKind,
        subject_id: u64,
        batch: &[EncryptedValue; 3],
    ) -> LifecycleResult<RequestHandle> {
        let expected: Vec<CipherShape> = batch.iter().map(|v| v.shape()).collect();

        let reservation = self.correlation.reserve(kind, subject_id)?;
        let handle = match self.oracle.request_decryption(batch, kind) {
            Ok(handle) => handle,
            Err(err) => {
                self.correlation.abort(reservation);
                return Err(err.into());
            }
        };
        self.correlation.commit(reservation, handle, expected)?;

        self.record(
            AuditRecord::new(AuditAction::RequestIssued, AuditOutcome::Success)
                .with_request(kind, handle)
                .with_subject(subject_id),
        );
        Ok(handle)
    }

    fn apply_generation(
        &self,
        entry: &CorrelationEntry,
        cleartext: &[Cleartext],
    ) -> LifecycleResult<CallbackOutcome> {
        // Shapes were checked against the request: [inputs, output, model_ref].
        let inputs = cleartext[0]
            .as_vector()
            .ok_or_else(|| LifecycleError::InvalidShape("expected input vector".to_string()))?;
        let output = cleartext[1]
            .as_scalar()
            .ok_or_else(|| LifecycleError::InvalidShape("expected output scalar".to_string()))?;
        // The model reference decrypts alongside the rest of the batch but
        // does not feed derivation.
        let _model_ref = cleartext[2]
            .as_scalar()
            .ok_or_else(|| LifecycleError::InvalidShape("expected model ref scalar".to_string()))?;

        let prediction = self.prediction(entry.subject_id)?;
        let scores = self.derivation.derive(inputs, output);

        let explanation_id = self.next_explanation_id.fetch_add(1, Ordering::SeqCst);
        let explanation = Explanation {
            id: explanation_id,
            prediction_id: entry.subject_id,
            owner: prediction.owner,
            encrypted_shap: self.encryptor.encrypt_vector(&scores.shap),
            encrypted_lime: self.encryptor.encrypt_vector(&scores.lime),
            encrypted_importance: self.encryptor.encrypt_vector(&scores.importance),
            generated_at: Utc::now(),
            revealed: false,
            cleartext: None,
        };
        self.put_entity(&Explanation::key(explanation_id), &explanation)?;

        self.record(
            AuditRecord::new(AuditAction::CallbackApplied, AuditOutcome::Success)
                .with_request(entry.kind, entry.handle)
                .with_subject(entry.subject_id)
                .with_detail(format!("explanation {} generated", explanation_id)),
        );
        Ok(CallbackOutcome::ExplanationGenerated {
            prediction_id: entry.subject_id,
            explanation_id,
        })
    }

    fn apply_reveal(
        &self,
        entry: &CorrelationEntry,
        cleartext: &[Cleartext],
    ) -> LifecycleResult<CallbackOutcome> {
        let shap = cleartext[0]
            .as_vector()
            .ok_or_else(|| LifecycleError::InvalidShape("expected shap vector".to_string()))?;
        let lime = cleartext[1]
            .as_vector()
            .ok_or_else(|| LifecycleError::InvalidShape("expected lime vector".to_string()))?;
        let importance = cleartext[2]
            .as_vector()
            .ok_or_else(|| LifecycleError::InvalidShape("expected importance vector".to_string()))?;
        if shap.len() != lime.len() || shap.len() != importance.len() {
            return Err(LifecycleError::InvalidShape(
                "score vectors have unequal lengths".to_string(),
            ));
        }

        let mut explanation = self.explanation(entry.subject_id)?;
        if explanation.revealed {
            // A reveal request issued in the window between a racing
            // callback's apply and its request's load. The scores are
            // already public; do not rewrite them.
            return Ok(self.drop_callback(
                entry.kind,
                entry.handle,
                Some(entry.subject_id),
                DropReason::Internal,
                "explanation already revealed",
            ));
        }

        explanation.cleartext = Some(RevealedScores {
            shap_values: shap.to_vec(),
            lime_weights: lime.to_vec(),
            importance: importance.to_vec(),
        });
        explanation.revealed = true;
        self.put_entity(&Explanation::key(explanation.id), &explanation)?;

        self.record(
            AuditRecord::new(AuditAction::CallbackApplied, AuditOutcome::Success)
                .with_request(entry.kind, entry.handle)
                .with_subject(entry.subject_id)
                .with_detail("scores revealed"),
        );
        Ok(CallbackOutcome::ExplanationRevealed {
            explanation_id: entry.subject_id,
        })
    }

    fn drop_callback(
        &self,
        kind: RequestKind,
        handle: RequestHandle,
        subject_id: Option<u64>,
        reason: DropReason,
        detail: &str,
    ) -> CallbackOutcome {
        Logger::log(
            Severity::Warn,
            "callback_dropped",
            &[
                ("detail", detail),
                ("handle", &handle.to_string()),
                ("kind", kind.as_str()),
                ("reason", reason.as_str()),
            ],
        );
        let mut record = AuditRecord::new(AuditAction::CallbackDropped, AuditOutcome::Rejected)
            .with_request(kind, handle)
            .with_detail(format!("{}: {}", reason.as_str(), detail));
        if let Some(id) = subject_id {
            record = record.with_subject(id);
        }
        self.record(record);

        CallbackOutcome::Dropped {
            kind,
            handle,
            reason,
        }
    }

    fn load<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        entity: &'static str,
        id: u64,
    ) -> LifecycleResult<T> {
        let blob = self
            .store
            .get(key)
            .ok_or(LifecycleError::NotFound { entity, id })?;
        serde_json::from_slice(&blob).map_err(|e| LifecycleError::Serialization {
            key: key.to_string(),
            source: e,
        })
    }

    fn put_entity<T: serde::Serialize>(&self, key: &str, entity: &T) -> LifecycleResult<()> {
        let blob = serde_json::to_vec(entity).map_err(|e| LifecycleError::Serialization {
            key: key.to_string(),
            source: e,
        })?;
        self.store.put(key, blob)?;
        Ok(())
    }

    fn record(&self, record: AuditRecord) {
        if let Err(err) = self.audit.append(&record) {
            Logger::log(
                Severity::Error,
                "audit_append_failed",
                &[("error", &err.to_string())],
            );
        }
    }
}

fn parse_id(key: &str, prefix: &str) -> Option<u64> {
    key.strip_prefix(prefix)?.parse().ok()
}
