//! The oracle client trait.

use thiserror::Error;

use super::proof::DecryptionProof;
use super::request::{RequestHandle, RequestKind};
use crate::cipher::{Cleartext, EncryptedValue};

/// Result type for oracle request submission.
pub type OracleResult<T> = Result<T, OracleError>;

/// Failures submitting a decryption request.
///
/// These are caller-visible: a request that the oracle never accepted has no
/// correlation entry and may simply be retried by the caller.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The oracle refused the request.
    #[error("oracle rejected decryption request: {0}")]
    Rejected(String),

    /// The oracle could not be reached.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Client for the external decryption oracle.
///
/// `request_decryption` returns immediately with a correlation handle; the
/// cleartext arrives later through an independently scheduled callback into
/// the lifecycle engine. Exactly one callback is delivered per accepted
/// request by a well-behaved oracle, but the engine defends against
/// replayed, duplicated, and forged deliveries regardless.
pub trait DecryptionOracle: Send + Sync {
    /// Submits a batch of ciphertexts for decryption.
    fn request_decryption(
        &self,
        batch: &[EncryptedValue],
        purpose: RequestKind,
    ) -> OracleResult<RequestHandle>;

    /// Checks that `cleartext` was produced and attested for `handle`.
    ///
    /// A `false` return is a security-relevant rejection, not a retryable
    /// error: the callback carrying this proof must be dropped.
    fn verify_proof(
        &self,
        handle: RequestHandle,
        cleartext: &[Cleartext],
        proof: &DecryptionProof,
    ) -> bool;
}
