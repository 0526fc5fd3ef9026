//! Decryption oracle boundary.
//!
//! The oracle is a trusted-but-verify external service: it receives a batch
//! of ciphertexts, returns a correlation handle immediately, and later
//! delivers the cleartext batch together with an attestation proof through
//! an independent callback. Its internal protocol (signatures, threshold
//! attestation) is out of scope here; this module fixes only the
//! request/verify contract and the canonical digest well-behaved oracles
//! attest over.

mod client;
mod proof;
mod request;

pub use client::{DecryptionOracle, OracleError, OracleResult};
pub use proof::{attestation_digest, DecryptionProof};
pub use request::{RequestHandle, RequestKind};
