//! On-disk record framing for the value log.
//!
//! Record format:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, includes this field and the checksum)
//! +------------------+
//! | Key              | (length-prefixed string)
//! +------------------+
//! | Value            | (length-prefixed bytes)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over length + key + value fields)
//! +------------------+
//! ```

use std::io;

/// A single keyed record in the value log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Entity key, e.g. `prediction/7`.
    pub key: String,
    /// Opaque serialized entity blob.
    pub value: Vec<u8>,
}

impl StoredRecord {
    /// Minimum size of a framed record: length + two length prefixes + checksum.
    const MIN_SIZE: usize = 4 + 4 + 4 + 4;

    /// Creates a record for the given key and blob.
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    fn body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.key.len() + self.value.len());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value);
        buf
    }

    /// Serializes the record with its length prefix and trailing checksum.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.body();
        let record_length = (4 + body.len() + 4) as u32;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&record_length.to_le_bytes());
        hasher.update(&body);
        let checksum = hasher.finalize();

        let mut out = Vec::with_capacity(record_length as usize);
        out.extend_from_slice(&record_length.to_le_bytes());
        out.extend_from_slice(&body);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }

    /// Deserializes one record from `data`, verifying its checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < Self::MIN_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record too short",
            ));
        }

        let record_length =
            u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_length < Self::MIN_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid record length: {}", record_length),
            ));
        }
        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data[..checksum_offset]);
        if hasher.finalize() != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "checksum mismatch",
            ));
        }

        let mut pos = 4;
        let key = read_prefixed(data, &mut pos, checksum_offset)?;
        let key = String::from_utf8(key)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "key is not UTF-8"))?;
        let value = read_prefixed(data, &mut pos, checksum_offset)?;

        if pos != checksum_offset {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "record has trailing bytes inside frame",
            ));
        }

        Ok((Self { key, value }, record_length))
    }
}

fn read_prefixed(data: &[u8], pos: &mut usize, limit: usize) -> io::Result<Vec<u8>> {
    if *pos + 4 > limit {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "field length prefix out of bounds",
        ));
    }
    let len = u32::from_le_bytes([
        data[*pos],
        data[*pos + 1],
        data[*pos + 2],
        data[*pos + 3],
    ]) as usize;
    *pos += 4;
    if *pos + len > limit {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "field extends past record frame",
        ));
    }
    let field = data[*pos..*pos + len].to_vec();
    *pos += len;
    Ok(field)
}
