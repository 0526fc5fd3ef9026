//! cipherlens - encrypted prediction lifecycle with oracle callback correlation
//!
//! Predictions are submitted as opaque ciphertext, their explanations are
//! generated and revealed through asynchronous decryption callbacks from a
//! trusted-but-verify oracle, and every callback is correlated, validated,
//! and applied at most once.

pub mod catalog;
pub mod cipher;
pub mod correlation;
pub mod lifecycle;
pub mod observability;
pub mod oracle;
pub mod store;
