//! Record type for the append-only log.
//!
//! A record is an opaque payload stamped with the offset the log assigned
//! to it. Records are serialized with a CRC32 trailer for corruption
//! detection.
//!
//! # Record Format
//!
//! ```text
//! [offset:u64][length:u32][value:bytes][crc32:u32]
//!     8B          4B         variable      4B
//! ```
//!
//! All integers are big-endian, matching the store and index formats. The
//! CRC covers everything before it.

use bytes::Bytes;
use driftlog_types::Offset;

use crate::StorageError;

// Byte sizes - typed constants prevent mismatch bugs between the encode
// and decode paths.
const OFFSET_SIZE: usize = 8;
const LEN_SIZE: usize = 4;
const CRC_SIZE: usize = 4;

/// Header size: offset(8) + length(4) = 12 bytes.
const HEADER_SIZE: usize = OFFSET_SIZE + LEN_SIZE;

/// A single record in the log.
///
/// Records are the on-disk unit of the store file. The offset is assigned
/// by the log before serialization, so a decoded record knows its own
/// position without consulting the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    offset: Offset,
    value: Bytes,
}

impl Record {
    /// Creates a record with the given offset and payload.
    pub fn new(offset: Offset, value: Bytes) -> Self {
        Self { offset, value }
    }

    /// Returns the offset of this record.
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Returns the payload of this record.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Consumes the record, returning just the payload.
    pub fn into_value(self) -> Bytes {
        self.value
    }

    /// Serializes the record to bytes.
    ///
    /// Format: `[offset:u64][length:u32][value][crc32:u32]`, big-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.value.len() + CRC_SIZE);

        // offset (8 bytes)
        buf.extend_from_slice(&self.offset.as_u64().to_be_bytes());

        // length (4 bytes)
        buf.extend_from_slice(&(self.value.len() as u32).to_be_bytes());

        // value (variable)
        buf.extend_from_slice(&self.value);

        // crc (4 bytes) - checksum of everything above
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());

        buf
    }

    /// Deserializes a record from bytes.
    ///
    /// Returns the parsed record and the number of bytes consumed. The
    /// payload is a zero-copy slice of `data`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnexpectedEof`] if the data is truncated
    /// - [`StorageError::CorruptedRecord`] if the CRC doesn't match
    pub fn from_bytes(data: &Bytes) -> Result<(Self, usize), StorageError> {
        if data.len() < HEADER_SIZE {
            return Err(StorageError::UnexpectedEof);
        }

        let offset = Offset::new(u64::from_be_bytes(
            data[..OFFSET_SIZE]
                .try_into()
                .expect("slice length equals OFFSET_SIZE after bounds check"),
        ));

        let length = u32::from_be_bytes(
            data[OFFSET_SIZE..HEADER_SIZE]
                .try_into()
                .expect("slice length equals LEN_SIZE after bounds check"),
        ) as usize;

        let total_size = HEADER_SIZE + length + CRC_SIZE;
        if data.len() < total_size {
            return Err(StorageError::UnexpectedEof);
        }

        // Zero-copy payload slice
        let value = data.slice(HEADER_SIZE..HEADER_SIZE + length);

        // Verify CRC before trusting the payload
        let stored_crc = u32::from_be_bytes(
            data[HEADER_SIZE + length..total_size]
                .try_into()
                .expect("slice length equals CRC_SIZE after bounds check"),
        );
        let computed_crc = crc32fast::hash(&data[..HEADER_SIZE + length]);

        if stored_crc != computed_crc {
            return Err(StorageError::CorruptedRecord);
        }

        Ok((Record { offset, value }, total_size))
    }
}
