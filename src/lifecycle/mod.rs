//! Encrypted entity lifecycle.
//!
//! A prediction is submitted in encrypted form and never transitions again;
//! everything that happens afterwards happens to its derived explanation:
//!
//! ```text
//! requestGeneration ──> (correlation entry) ──> generation callback
//!                                                    │
//!                                                    v
//!                                          Explanation (revealed = false)
//!                                                    │
//! requestReveal ──────> (correlation entry) ──> reveal callback
//!                                                    │
//!                                                    v
//!                                          Explanation (revealed = true)
//! ```
//!
//! Both request/callback pairs run through one generic two-phase decrypt
//! routine: reserve the subject, ask the oracle, commit the correlation;
//! then consume the correlation, check arity, verify the proof, apply.
//! Callback-side failures are dropped and audited, never raised to callers.

mod derive;
mod engine;
mod entities;
mod errors;

pub use derive::{DeriveScores, DerivedScores, MagnitudeAttribution};
pub use engine::{CallbackOutcome, DropReason, LifecycleEngine, RevealRequest};
pub use entities::{
    Explanation, OwnerId, Prediction, RevealedScores, EXPLANATION_KEY_PREFIX,
    PREDICTION_KEY_PREFIX,
};
pub use errors::{LifecycleError, LifecycleResult};
