//! Logging and audit.
//!
//! Two channels: a synchronous structured JSON logger for operational
//! events, and an append-only durable audit file that records every
//! protocol-relevant outcome. Anything the callback boundary swallows
//! (replayed handles, failed proofs, malformed batches) must still be
//! observable here.

mod audit;
mod logger;

pub use audit::{AuditAction, AuditLog, AuditOutcome, AuditRecord};
pub use logger::{Logger, Severity};
