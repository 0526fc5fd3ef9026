//! Correlation error types.

use thiserror::Error;

use crate::oracle::{RequestHandle, RequestKind};

/// Result type for correlation-table operations.
pub type CorrelationResult<T> = Result<T, CorrelationError>;

/// Correlation protocol violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The subject already has an outstanding request of this kind.
    /// Caller-visible and recoverable: retry after the callback or a sweep.
    #[error("{kind} request already in flight for subject {subject_id}")]
    RequestInFlight {
        kind: RequestKind,
        subject_id: u64,
    },

    /// The oracle returned a handle that is already registered. Handles are
    /// unique by construction, so this is fatal to the request.
    #[error("duplicate {kind} correlation handle {handle}")]
    DuplicateHandle {
        kind: RequestKind,
        handle: RequestHandle,
    },

    /// No outstanding entry for this handle. Expected under replayed or
    /// duplicated callback delivery; the callback must be dropped, never
    /// reprocessed.
    #[error("unknown {kind} correlation handle {handle}")]
    UnknownHandle {
        kind: RequestKind,
        handle: RequestHandle,
    },
}
