//! Error types for storage operations.

use std::io;

use driftlog_types::{CommitLogError, Offset};

/// Errors that can occur during storage operations.
///
/// Only [`StorageError::OffsetOutOfRange`] is a normal part of the caller
/// contract; everything else is an I/O or format fault that the engine
/// surfaces without retrying.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// Filesystem I/O error.
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),

    /// The requested offset is below the log's lowest or above its highest.
    #[error("offset {0} out of range")]
    OffsetOutOfRange(Offset),

    /// The index has exhausted its pre-allocated region. The owning
    /// segment is maxed; the log rolls over on the next append.
    #[error("index full: {size} of {max_bytes} bytes used")]
    IndexFull { size: u64, max_bytes: u64 },

    /// Record CRC mismatch - the record data is corrupted.
    #[error("corrupted record: CRC mismatch")]
    CorruptedRecord,

    /// The record encoding was truncated (not enough bytes).
    #[error("unexpected end of record data")]
    UnexpectedEof,

    /// A store length prefix points past the end of the file.
    #[error("corrupted store: entry at position {position} extends past size {size}")]
    StoreCorrupted { position: u64, size: u64 },

    /// The persisted index length is not a whole number of entries.
    #[error("misaligned index file: {size} bytes is not a multiple of {entry_width}")]
    IndexMisaligned { size: u64, entry_width: u64 },
}

impl From<StorageError> for CommitLogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OffsetOutOfRange(offset) => Self::OffsetOutOfRange(offset),
            _ => Self::Storage,
        }
    }
}
