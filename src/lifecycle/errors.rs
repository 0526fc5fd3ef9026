//! Lifecycle error types.
//!
//! These are the caller-facing failures: they come back synchronously from
//! `submit_prediction`, `request_generation`, and `request_reveal`. Failures
//! on the oracle callback path never appear here; those are swallowed at the
//! callback boundary and reported through the audit log.

use thiserror::Error;

use crate::correlation::CorrelationError;
use crate::oracle::{OracleError, RequestKind};
use crate::store::StoreError;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Caller-visible lifecycle failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The referenced entity does not exist. Recoverable.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// The caller is not the recorded owner of the entity.
    #[error("caller {caller} does not own {entity} {id}")]
    NotOwner {
        entity: &'static str,
        id: u64,
        caller: String,
    },

    /// A request of this kind is already outstanding for the subject.
    /// Recoverable: retry after the callback arrives or a sweep runs.
    #[error("{kind} request already in flight for subject {subject_id}")]
    RequestInFlight { kind: RequestKind, subject_id: u64 },

    /// A ciphertext had the wrong shape for its field.
    #[error("invalid ciphertext shape: {0}")]
    InvalidShape(String),

    /// Correlation bookkeeping failure (duplicate oracle handle). Fatal to
    /// the request: handles are unique by construction.
    #[error(transparent)]
    Correlation(CorrelationError),

    /// The oracle refused or could not receive the request.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An entity blob could not be encoded or decoded.
    #[error("entity serialization failed for {key}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<CorrelationError> for LifecycleError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::RequestInFlight { kind, subject_id } => {
                LifecycleError::RequestInFlight { kind, subject_id }
            }
            other => LifecycleError::Correlation(other),
        }
    }
}
