//! Opaque ciphertext handles and decoded cleartext values.

use serde::{Deserialize, Serialize};

/// Shape of the plaintext behind a ciphertext handle.
///
/// The shape is public metadata: it is set by the encryptor at encryption
/// time and used to validate the arity of oracle callbacks. It reveals the
/// dimensionality of the plaintext, never its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherShape {
    /// A single encrypted number.
    Scalar,
    /// An encrypted vector with the given element count.
    Vector(usize),
}

/// Opaque handle to an encrypted scalar or vector.
///
/// The ciphertext bytes are never inspected by this crate; they pass through
/// from the encryptor to the store and on to the oracle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    shape: CipherShape,
    #[serde(with = "base64_bytes")]
    bytes: Vec<u8>,
}

impl EncryptedValue {
    /// Wraps ciphertext bytes for an encrypted scalar.
    pub fn scalar(bytes: Vec<u8>) -> Self {
        Self {
            shape: CipherShape::Scalar,
            bytes,
        }
    }

    /// Wraps ciphertext bytes for an encrypted vector of `len` elements.
    pub fn vector(bytes: Vec<u8>, len: usize) -> Self {
        Self {
            shape: CipherShape::Vector(len),
            bytes,
        }
    }

    /// Returns the declared plaintext shape.
    pub fn shape(&self) -> CipherShape {
        self.shape
    }

    /// Raw ciphertext bytes, for handing to the oracle.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A decrypted value delivered by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cleartext {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Cleartext {
    /// Whether this cleartext matches the shape declared by a ciphertext.
    pub fn matches(&self, shape: CipherShape) -> bool {
        match (self, shape) {
            (Cleartext::Scalar(_), CipherShape::Scalar) => true,
            (Cleartext::Vector(v), CipherShape::Vector(len)) => v.len() == len,
            _ => false,
        }
    }

    /// Returns the scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Cleartext::Scalar(v) => Some(*v),
            Cleartext::Vector(_) => None,
        }
    }

    /// Returns the vector elements, if this is a vector.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Cleartext::Vector(v) => Some(v),
            Cleartext::Scalar(_) => None,
        }
    }
}

/// Serde adapter rendering ciphertext bytes as base64 in JSON blobs.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
