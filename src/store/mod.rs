//! Durable keyed record storage.
//!
//! The store holds the canonical persistent state of every entity as an
//! opaque serialized blob under a string key, alongside an append-only key
//! index used for enumeration.
//!
//! # Design Principles
//!
//! - Append-only value log, no in-place updates; latest record wins per key
//! - Every record is checksum-verified on replay
//! - A key is appended (and fsync'd) to the index before its value record
//!   is written, so readers may observe an indexed key whose value is not
//!   yet visible; they must treat it as "not yet available", never an error
//! - Absence on `get` is `None`, not a failure
//! - No deletion: entities are append-only and monotonically revealed

mod errors;
mod record;
mod store;

pub use errors::{StoreError, StoreResult};
pub use record::StoredRecord;
pub use store::RecordStore;
