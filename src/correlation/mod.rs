//! Outstanding-request correlation.
//!
//! The correlation table is the linchpin of the reveal protocol: it maps
//! each outstanding oracle request to the entity awaiting its callback, and
//! its atomic check-and-remove `consume` is what makes applying a decryption
//! an at-most-once operation under replayed or duplicated delivery.
//!
//! # Invariants Enforced
//!
//! - At most one outstanding entry per (kind, subject): duplicate caller
//!   requests fail before any oracle call is made
//! - Entries for the two purposes are keyed separately and never collide,
//!   even when handles share a numeric space
//! - `consume` removes the entry atomically: of N concurrent consumers of
//!   one handle, exactly one succeeds and the rest observe `UnknownHandle`
//! - Stale entries are only removed by the explicit sweep; the table never
//!   retries the oracle on its own

mod errors;
mod table;

pub use errors::{CorrelationError, CorrelationResult};
pub use table::{CorrelationEntry, CorrelationTable, Reservation};
