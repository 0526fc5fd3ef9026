//! The correlation table.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::errors::{CorrelationError, CorrelationResult};
use crate::cipher::CipherShape;
use crate::oracle::{RequestHandle, RequestKind};

/// One outstanding decryption request awaiting its callback.
#[derive(Debug, Clone)]
pub struct CorrelationEntry {
    /// Oracle-assigned handle.
    pub handle: RequestHandle,
    /// Which transition the callback will drive.
    pub kind: RequestKind,
    /// The prediction or explanation awaiting this callback.
    pub subject_id: u64,
    /// Shapes the cleartext batch must decode to, in batch order.
    pub expected: Vec<CipherShape>,
    /// When the request was registered; used by the stale sweep.
    pub registered_at: DateTime<Utc>,
}

/// A claimed (kind, subject) slot held across the oracle call.
///
/// Reservations keep the in-flight uniqueness check and the oracle request
/// from racing: the slot is taken under the table lock before the oracle is
/// called, so a concurrent duplicate request fails with `RequestInFlight`
/// instead of triggering a second oracle call. Every reservation must be
/// either committed with the oracle's handle or aborted.
#[must_use = "a reservation must be committed or aborted"]
#[derive(Debug)]
pub struct Reservation {
    kind: RequestKind,
    subject_id: u64,
}

/// Maps outstanding request handles to the entities awaiting them.
///
/// All state lives behind a single mutex; every operation is a short
/// critical section and no lock is ever held across an oracle call.
pub struct CorrelationTable {
    inner: Mutex<TableInner>,
}

struct TableInner {
    /// Outstanding entries, keyed by purpose and handle.
    entries: HashMap<(RequestKind, RequestHandle), CorrelationEntry>,
    /// Subjects with a claimed or outstanding request, per purpose.
    busy: HashSet<(RequestKind, u64)>,
}

impl CorrelationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TableInner {
                entries: HashMap::new(),
                busy: HashSet::new(),
            }),
        }
    }

    /// Claims the (kind, subject) slot ahead of an oracle call.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::RequestInFlight`] if the subject already has a
    /// claimed or outstanding request of this kind.
    pub fn reserve(&self, kind: RequestKind, subject_id: u64) -> CorrelationResult<Reservation> {
        let mut inner = self.inner.lock().expect("correlation lock poisoned");
        if !inner.busy.insert((kind, subject_id)) {
            return Err(CorrelationError::RequestInFlight { kind, subject_id });
        }
        Ok(Reservation { kind, subject_id })
    }

    /// Binds an accepted oracle request to its reservation.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::DuplicateHandle`] if the handle is already
    /// registered for this kind. The reservation is released either way.
    pub fn commit(
        &self,
        reservation: Reservation,
        handle: RequestHandle,
        expected: Vec<CipherShape>,
    ) -> CorrelationResult<()> {
        let Reservation { kind, subject_id } = reservation;
        let mut inner = self.inner.lock().expect("correlation lock poisoned");
        if inner.entries.contains_key(&(kind, handle)) {
            inner.busy.remove(&(kind, subject_id));
            return Err(CorrelationError::DuplicateHandle { kind, handle });
        }
        inner.entries.insert(
            (kind, handle),
            CorrelationEntry {
                handle,
                kind,
                subject_id,
                expected,
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Releases a reservation after a failed oracle call.
    pub fn abort(&self, reservation: Reservation) {
        let Reservation { kind, subject_id } = reservation;
        let mut inner = self.inner.lock().expect("correlation lock poisoned");
        inner.busy.remove(&(kind, subject_id));
    }

    /// Atomically removes and returns the entry for `(kind, handle)`.
    ///
    /// Exactly one of any number of concurrent consumers of the same handle
    /// succeeds; the rest observe [`CorrelationError::UnknownHandle`].
    pub fn consume(
        &self,
        kind: RequestKind,
        handle: RequestHandle,
    ) -> CorrelationResult<CorrelationEntry> {
        let mut inner = self.inner.lock().expect("correlation lock poisoned");
        match inner.entries.remove(&(kind, handle)) {
            Some(entry) => {
                inner.busy.remove(&(kind, entry.subject_id));
                Ok(entry)
            }
            None => Err(CorrelationError::UnknownHandle { kind, handle }),
        }
    }

    /// Removes and returns every entry older than `max_age`.
    ///
    /// Swept subjects become free for a fresh request; the oracle itself is
    /// never retried here.
    pub fn sweep_stale(&self, max_age: Duration) -> Vec<CorrelationEntry> {
        let cutoff = Utc::now() - max_age;
        let mut inner = self.inner.lock().expect("correlation lock poisoned");
        let stale_keys: Vec<(RequestKind, RequestHandle)> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.registered_at < cutoff)
            .map(|(k, _)| *k)
            .collect();
        let mut swept = Vec::with_capacity(stale_keys.len());
        for key in stale_keys {
            if let Some(entry) = inner.entries.remove(&key) {
                inner.busy.remove(&(entry.kind, entry.subject_id));
                swept.push(entry);
            }
        }
        swept
    }

    /// Number of outstanding entries (committed, not reservations).
    pub fn outstanding(&self) -> usize {
        self.inner
            .lock()
            .expect("correlation lock poisoned")
            .entries
            .len()
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
