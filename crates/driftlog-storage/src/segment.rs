//! A log segment: one store file paired with one index file.
//!
//! Segments cover consecutive, non-overlapping ranges of offset space,
//! each identified by its base offset - the smallest offset it stores and
//! the prefix of both file names (`<base>.store`, `<base>.index`). Only
//! the log's last segment accepts appends; earlier segments are immutable
//! history until truncation removes them.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use driftlog_types::Offset;

use crate::config::SegmentConfig;
use crate::index::{Index, ENTRY_WIDTH};
use crate::record::Record;
use crate::store::Store;
use crate::StorageError;

/// One store + index pair under a base offset.
///
/// # Invariants
///
/// - `next_offset == base_offset + index.entries()` between operations
/// - Appends and reads stay within `[base_offset, next_offset)`
#[derive(Debug)]
pub(crate) struct Segment {
    store: Store,
    index: Index,
    base_offset: Offset,
    next_offset: Offset,
    config: SegmentConfig,
}

impl Segment {
    /// Opens (creating if absent) the segment's files in `dir`.
    ///
    /// The next offset to assign is recovered from the index: one past the
    /// last entry, or the base offset when the index is empty.
    pub(crate) fn open(
        dir: &Path,
        base_offset: Offset,
        config: &SegmentConfig,
    ) -> Result<Self, StorageError> {
        let store = Store::open(&dir.join(format!("{base_offset}.store")))?;
        let index = Index::open(
            &dir.join(format!("{base_offset}.index")),
            config.max_index_bytes,
        )?;

        let next_offset = match index.last_entry() {
            Some((rel, _)) => base_offset + u64::from(rel) + 1,
            None => base_offset,
        };

        tracing::debug!(base = %base_offset, next = %next_offset, "segment opened");

        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config: config.clone(),
        })
    }

    /// Appends `value`, assigning it the segment's next offset.
    ///
    /// The record is stamped with its offset before encoding, so the store
    /// bytes are self-describing. If the index write fails because the
    /// region is exhausted, the store bytes just written become an inert
    /// orphan: no index entry references them, the segment is maxed, and
    /// the log rolls over - so nothing ever appends after them.
    pub(crate) fn append(&mut self, value: Bytes) -> Result<Offset, StorageError> {
        let offset = self.next_offset;
        let record = Record::new(offset, value);

        let (_, position) = self.store.append(&record.to_bytes())?;
        self.index
            .write((offset - self.base_offset) as u32, position)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Reads the record at an absolute offset.
    ///
    /// # Errors
    ///
    /// [`StorageError::OffsetOutOfRange`] if the offset is outside
    /// `[base_offset, next_offset)` or the index has no entry for it.
    pub(crate) fn read(&self, offset: Offset) -> Result<Record, StorageError> {
        if offset < self.base_offset || offset >= self.next_offset {
            return Err(StorageError::OffsetOutOfRange(offset));
        }

        let rel = (offset - self.base_offset) as u32;
        let (_, position) = self
            .index
            .get(rel)
            .ok_or(StorageError::OffsetOutOfRange(offset))?;

        let encoded = self.store.read(position)?;
        let (record, _) = Record::from_bytes(&encoded)?;

        debug_assert_eq!(record.offset(), offset, "stored offset mismatch");

        Ok(record)
    }

    /// Whether either file has reached its cap.
    ///
    /// The index check asks whether one more entry would overflow, so a
    /// segment whose append just failed on a full index reports maxed even
    /// when the cap is not a multiple of the entry width.
    pub(crate) fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() + ENTRY_WIDTH as u64 > self.config.max_index_bytes
    }

    /// Flushes both files to disk without closing.
    pub(crate) fn sync(&self) -> Result<(), StorageError> {
        self.store.sync()?;
        self.index.sync()
    }

    /// Closes the index first (its truncation observes the final write
    /// order), then the store.
    pub(crate) fn close(self) -> Result<(), StorageError> {
        self.index.close()?;
        self.store.close()
    }

    /// Closes the segment and deletes both files.
    pub(crate) fn remove(self) -> Result<(), StorageError> {
        let index_path = self.index.path().to_path_buf();
        let store_path = self.store.path().to_path_buf();

        self.close()?;

        fs::remove_file(index_path)?;
        fs::remove_file(store_path)?;
        Ok(())
    }

    pub(crate) fn base_offset(&self) -> Offset {
        self.base_offset
    }

    pub(crate) fn next_offset(&self) -> Offset {
        self.next_offset
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }
}
