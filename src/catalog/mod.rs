//! Entity enumeration over the record store.
//!
//! Rebuilds the visible collection of entities by reading the key index and
//! resolving each key, without scanning an unbounded key space. Keys whose
//! value is transiently absent (index written, value not yet visible) are
//! skipped, never errored on. Sorting for presentation is the consumer's
//! policy, not a property of the catalog.

use std::sync::Arc;

use crate::lifecycle::{
    Explanation, Prediction, EXPLANATION_KEY_PREFIX, PREDICTION_KEY_PREFIX,
};
use crate::observability::{Logger, Severity};
use crate::store::RecordStore;

/// A listed entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    Prediction(Prediction),
    Explanation(Explanation),
}

/// Lister over the store's key index.
pub struct Catalog {
    store: Arc<RecordStore>,
}

impl Catalog {
    /// Creates a catalog over an opened store.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Lazily enumerates every visible entity.
    ///
    /// The key set is snapshotted up front; each key resolves on demand.
    /// Unavailable keys are skipped; blobs that fail to decode are skipped
    /// with a warning rather than aborting the listing.
    pub fn list_all(&self) -> impl Iterator<Item = EntityRecord> + '_ {
        self.store
            .list_keys()
            .into_iter()
            .filter_map(move |key| self.resolve(&key))
    }

    fn resolve(&self, key: &str) -> Option<EntityRecord> {
        let blob = self.store.get(key)?;
        let decoded = if key.starts_with(PREDICTION_KEY_PREFIX) {
            serde_json::from_slice::<Prediction>(&blob)
                .map(EntityRecord::Prediction)
                .map_err(|e| e.to_string())
        } else if key.starts_with(EXPLANATION_KEY_PREFIX) {
            serde_json::from_slice::<Explanation>(&blob)
                .map(EntityRecord::Explanation)
                .map_err(|e| e.to_string())
        } else {
            // Foreign keys in a shared store are not the catalog's concern.
            return None;
        };
        match decoded {
            Ok(record) => Some(record),
            Err(err) => {
                Logger::log(
                    Severity::Warn,
                    "catalog_decode_skipped",
                    &[("error", err.as_str()), ("key", key)],
                );
                None
            }
        }
    }
}
