//! Store error types.

use std::io;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
///
/// `Corruption` is fatal: a store that fails checksum verification during
/// replay must not be used, since silently skipping a damaged record could
/// resurrect stale entity state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Disk I/O failure.
    #[error("store I/O failure ({context})")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Checksum or framing failure in the value log.
    #[error("store corruption at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },
}

impl StoreError {
    /// Wraps an I/O error with operation context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Builds a corruption error at the given log offset.
    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error means the store must not be used further.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Corruption { .. })
    }
}
