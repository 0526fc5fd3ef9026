//! External encryption capability boundary.

use super::value::EncryptedValue;

/// Produces ciphertext handles for plaintext scores.
///
/// The lifecycle engine uses this when an explanation's derived score vectors
/// are re-encrypted before being persisted, so they can later be revealed
/// through the oracle like any other ciphertext. Implementations must be
/// deterministic: encrypting the same plaintext must yield a ciphertext the
/// oracle decrypts back to that plaintext.
pub trait Encryptor: Send + Sync {
    /// Encrypts a single number.
    fn encrypt_scalar(&self, value: f64) -> EncryptedValue;

    /// Encrypts an ordered vector of numbers.
    fn encrypt_vector(&self, values: &[f64]) -> EncryptedValue;
}
