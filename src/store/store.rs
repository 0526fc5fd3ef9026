//! The record store: append-only value log plus append-only key index.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Mutex;

use super::errors::{StoreError, StoreResult};
use super::record::StoredRecord;

const RECORDS_FILE: &str = "records.dat";
const INDEX_FILE: &str = "keys.idx";

/// Durable keyed blob store with a maintained key index.
///
/// `put` is an idempotent overwrite; the value log keeps every version and
/// the latest record wins on replay. The key index is appended and fsync'd
/// before the value record, so a crash between the two leaves an indexed key
/// with no value. Readers treat that key as not yet available.
///
/// All operations are single-key and internally synchronized; the store is
/// safe to share across threads.
#[derive(Debug)]
pub struct RecordStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    records_file: File,
    index_file: File,
    /// Latest value per key, rebuilt from the log on open.
    values: HashMap<String, Vec<u8>>,
    /// Keys in first-appended order.
    key_order: Vec<String>,
    /// Set view of `key_order`, to keep index appends idempotent.
    indexed: HashSet<String>,
}

impl RecordStore {
    /// Opens or creates the store under `data_dir`, replaying both files.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the files cannot be opened or read, and
    /// [`StoreError::Corruption`] if a log record fails checksum or framing
    /// verification. Corruption is fatal; the store must not be used.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::io(format!("create data dir {}", data_dir.display()), e)
        })?;

        let records_path = data_dir.join(RECORDS_FILE);
        let index_path = data_dir.join(INDEX_FILE);

        let (key_order, indexed) = Self::replay_index(&index_path)?;
        let values = Self::replay_records(&records_path)?;

        let records_file = Self::open_append(&records_path)?;
        let index_file = Self::open_append(&index_path)?;

        let mut inner = StoreInner {
            records_file,
            index_file,
            values,
            key_order,
            indexed,
        };

        // A value record without an index entry cannot happen through `put`
        // (index is written first), but a replayed log is trusted over the
        // index: re-add any such key so it stays enumerable.
        let missing: Vec<String> = inner
            .values
            .keys()
            .filter(|k| !inner.indexed.contains(*k))
            .cloned()
            .collect();
        for key in missing {
            inner.append_index_entry(&key)?;
        }

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Writes `value` under `key`, overwriting any previous value.
    ///
    /// New keys are appended to the index (and the index fsync'd) before the
    /// value record is written.
    pub fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");

        if !inner.indexed.contains(key) {
            inner.append_index_entry(key)?;
        }

        let bytes = StoredRecord::new(key, value.clone()).serialize();
        inner
            .records_file
            .write_all(&bytes)
            .map_err(|e| StoreError::io(format!("append record for {}", key), e))?;
        inner
            .records_file
            .sync_data()
            .map_err(|e| StoreError::io("fsync value log", e))?;

        inner.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Returns the latest value for `key`, or `None` if absent.
    ///
    /// Absence includes the transient window where the key is indexed but
    /// its value record is not yet visible.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.values.get(key).cloned()
    }

    /// Returns all indexed keys in first-appended order, without duplicates.
    pub fn list_keys(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.key_order.clone()
    }

    fn open_append(path: &Path) -> StoreResult<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::io(format!("open {}", path.display()), e))
    }

    fn replay_index(path: &Path) -> StoreResult<(Vec<String>, HashSet<String>)> {
        let mut key_order = Vec::new();
        let mut indexed = HashSet::new();
        if !path.exists() {
            return Ok((key_order, indexed));
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| StoreError::io(format!("read {}", path.display()), e))?;
        for line in contents.lines() {
            let key = line.trim();
            // A torn final line (crash mid-append) is ignored; the key was
            // never acknowledged.
            if key.is_empty() {
                continue;
            }
            if indexed.insert(key.to_string()) {
                key_order.push(key.to_string());
            }
        }
        Ok((key_order, indexed))
    }

    fn replay_records(path: &Path) -> StoreResult<HashMap<String, Vec<u8>>> {
        let mut values = HashMap::new();
        if !path.exists() {
            return Ok(values);
        }
        let mut file = File::open(path)
            .map_err(|e| StoreError::io(format!("open {}", path.display()), e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| StoreError::io("read value log", e))?;

        let mut offset = 0usize;
        while offset < data.len() {
            let (record, consumed) = StoredRecord::deserialize(&data[offset..])
                .map_err(|e| StoreError::corruption(offset as u64, e.to_string()))?;
            values.insert(record.key, record.value);
            offset += consumed;
        }
        Ok(values)
    }
}

impl StoreInner {
    fn append_index_entry(&mut self, key: &str) -> StoreResult<()> {
        self.index_file
            .write_all(format!("{}\n", key).as_bytes())
            .map_err(|e| StoreError::io(format!("append index entry for {}", key), e))?;
        self.index_file
            .sync_data()
            .map_err(|e| StoreError::io("fsync key index", e))?;
        self.indexed.insert(key.to_string());
        self.key_order.push(key.to_string());
        Ok(())
    }
}
