//! Request handles and purpose tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique token linking an oracle request to the entity awaiting its result.
///
/// Handles are allocated by the oracle and are only guaranteed unique per
/// purpose; the correlation table keys on `(kind, handle)` so the two
/// purposes never collide even when they share a numeric space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestHandle(u64);

impl RequestHandle {
    /// Wraps a raw handle value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw handle value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which lifecycle transition a decryption request will drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Decrypt a prediction's ciphertexts to generate its explanation.
    Generation,
    /// Decrypt an explanation's score ciphertexts to reveal them.
    Reveal,
}

impl RequestKind {
    /// Stable string form, used in audit records and attestation digests.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Generation => "GENERATION",
            RequestKind::Reveal => "REVEAL",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
