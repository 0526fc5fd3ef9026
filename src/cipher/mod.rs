//! Ciphertext handle types and the external encryption capability.
//!
//! Nothing in this crate ever decodes ciphertext. An [`EncryptedValue`] is an
//! opaque handle that is produced by an [`Encryptor`], stored, and handed to
//! the decryption oracle as-is. The only structure the protocol relies on is
//! the shape tag, which lets callback payloads be validated for arity without
//! any access to plaintext.

mod encryptor;
mod value;

pub use encryptor::Encryptor;
pub use value::{CipherShape, Cleartext, EncryptedValue};
