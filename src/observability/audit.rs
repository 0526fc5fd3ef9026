//! Append-only protocol audit log.
//!
//! Every request issuance, every callback outcome (applied or dropped, with
//! the drop reason), and every sweep eviction is recorded here. The file is
//! JSON-lines, append-only, and synced before the operation that produced
//! the record is acknowledged, so dropped callbacks remain observable even
//! though they are never surfaced to callers.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oracle::{RequestHandle, RequestKind};

/// Audit action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// A prediction was submitted and persisted.
    PredictionSubmitted,

    /// A decryption request was issued and its correlation registered.
    RequestIssued,

    /// A reveal request found the explanation already revealed (no-op).
    RevealAlreadyDone,

    /// A callback passed validation and its transition was applied.
    CallbackApplied,

    /// A callback was rejected at the boundary and dropped.
    CallbackDropped,

    /// A stale correlation entry was removed by the sweep.
    SweepEvicted,
}

impl AuditAction {
    /// Returns the action name string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PredictionSubmitted => "PREDICTION_SUBMITTED",
            AuditAction::RequestIssued => "REQUEST_ISSUED",
            AuditAction::RevealAlreadyDone => "REVEAL_ALREADY_DONE",
            AuditAction::CallbackApplied => "CALLBACK_APPLIED",
            AuditAction::CallbackDropped => "CALLBACK_DROPPED",
            AuditAction::SweepEvicted => "SWEEP_EVICTED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    /// Action succeeded.
    Success,

    /// Action was rejected or dropped.
    Rejected,
}

impl AuditOutcome {
    /// Returns the outcome string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID.
    pub id: Uuid,

    /// When the action occurred.
    pub timestamp: DateTime<Utc>,

    /// The action that occurred.
    pub action: AuditAction,

    /// Outcome of the action.
    pub outcome: AuditOutcome,

    /// Request purpose, if the action concerns an oracle request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RequestKind>,

    /// Correlation handle, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,

    /// Prediction or explanation id the action concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<u64>,

    /// Reason detail for rejections and drops.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditRecord {
    /// Create a new audit record.
    pub fn new(action: AuditAction, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            outcome,
            kind: None,
            handle: None,
            subject_id: None,
            detail: None,
        }
    }

    /// Set the request purpose and handle.
    pub fn with_request(mut self, kind: RequestKind, handle: RequestHandle) -> Self {
        self.kind = Some(kind);
        self.handle = Some(handle.value());
        self
    }

    /// Set the subject entity id.
    pub fn with_subject(mut self, subject_id: u64) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    /// Set the rejection/drop detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Append-only audit log backed by a JSON-lines file.
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl AuditLog {
    /// Opens or creates `audit.log` under the data directory.
    pub fn open(data_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("audit.log");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Appends a record and syncs it to disk.
    pub fn append(&self, record: &AuditRecord) -> io::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().expect("audit lock poisoned");
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        writer.get_ref().sync_data()
    }

    /// Path of the underlying audit file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back every record in the log, oldest first.
    pub fn read_all(&self) -> io::Result<Vec<AuditRecord>> {
        let contents = std::fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let record: AuditRecord = serde_json::from_str(line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();

        log.append(
            &AuditRecord::new(AuditAction::RequestIssued, AuditOutcome::Success)
                .with_request(RequestKind::Generation, RequestHandle::new(5))
                .with_subject(1),
        )
        .unwrap();
        log.append(
            &AuditRecord::new(AuditAction::CallbackDropped, AuditOutcome::Rejected)
                .with_request(RequestKind::Generation, RequestHandle::new(5))
                .with_detail("proof verification failed"),
        )
        .unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::RequestIssued);
        assert_eq!(records[0].handle, Some(5));
        assert_eq!(records[1].outcome, AuditOutcome::Rejected);
        assert_eq!(
            records[1].detail.as_deref(),
            Some("proof verification failed")
        );
    }

    #[test]
    fn test_reopen_appends_rather_than_truncates() {
        let dir = TempDir::new().unwrap();
        {
            let log = AuditLog::open(dir.path()).unwrap();
            log.append(&AuditRecord::new(
                AuditAction::PredictionSubmitted,
                AuditOutcome::Success,
            ))
            .unwrap();
        }
        let log = AuditLog::open(dir.path()).unwrap();
        log.append(&AuditRecord::new(
            AuditAction::SweepEvicted,
            AuditOutcome::Rejected,
        ))
        .unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);
    }
}
