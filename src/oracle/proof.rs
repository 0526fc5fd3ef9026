//! Decryption attestation proofs.

use sha2::{Digest, Sha256};

use super::request::{RequestHandle, RequestKind};
use crate::cipher::Cleartext;

/// Opaque attestation blob accompanying a decryption callback.
///
/// The protocol never interprets the proof itself; only the oracle's
/// `verify_proof` decides whether to trust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionProof {
    bytes: Vec<u8>,
}

impl DecryptionProof {
    /// Wraps raw proof bytes as delivered by the oracle.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Canonical SHA-256 digest binding a cleartext batch to its request.
///
/// Covers the purpose tag, the handle, and the JSON encoding of the batch.
/// A well-behaved oracle attests over exactly this digest, which ties the
/// cleartext to one `(kind, handle)` pair and makes a proof unusable for
/// replay against any other request.
pub fn attestation_digest(
    handle: RequestHandle,
    kind: RequestKind,
    cleartext: &[Cleartext],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(handle.value().to_le_bytes());
    // Cleartext is serde-encodable; JSON gives a stable canonical byte form.
    let encoded = serde_json::to_vec(cleartext).unwrap_or_default();
    hasher.update(&encoded);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let batch = vec![Cleartext::Vector(vec![1.0, 2.0]), Cleartext::Scalar(3.0)];
        let a = attestation_digest(RequestHandle::new(7), RequestKind::Generation, &batch);
        let b = attestation_digest(RequestHandle::new(7), RequestKind::Generation, &batch);
        assert_eq!(hex::encode(a), hex::encode(b));
    }

    #[test]
    fn test_digest_binds_handle_and_kind() {
        let batch = vec![Cleartext::Scalar(1.0)];
        let base = attestation_digest(RequestHandle::new(1), RequestKind::Generation, &batch);
        let other_handle =
            attestation_digest(RequestHandle::new(2), RequestKind::Generation, &batch);
        let other_kind = attestation_digest(RequestHandle::new(1), RequestKind::Reveal, &batch);
        assert_ne!(base, other_handle);
        assert_ne!(base, other_kind);
    }
}
