//! Memory-mapped offset index.
//!
//! The index maps a segment-relative offset to the byte position of the
//! corresponding entry in the store file. Entries are fixed-width and
//! packed with no header:
//!
//! ```text
//! [relative offset:u32][store position:u64]
//!        4B                   8B
//! ```
//!
//! Both fields are big-endian. At open the file is grown to the configured
//! cap and memory-mapped once; growing a live map is non-portable, so the
//! cap is the hard bound decided at segment creation. A logical `size`
//! cursor tracks written bytes; on close the map is flushed and the file
//! truncated back to `size`, so a reopened index sees real entries only.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::StorageError;

// Byte widths of an entry's fields.
const OFF_WIDTH: usize = 4;
const POS_WIDTH: usize = 8;

/// Total width of one index entry.
pub(crate) const ENTRY_WIDTH: usize = OFF_WIDTH + POS_WIDTH;

/// Fixed-width (relative offset, store position) index over a mapped file.
///
/// # Invariants
///
/// - `size` is a multiple of [`ENTRY_WIDTH`] and never exceeds the map
/// - The k-th entry's relative offset is k (entries are dense, written in
///   append order by the owning segment)
///
/// Single-writer by convention: the owning segment serializes appends.
/// Concurrent reads of the map are safe.
#[derive(Debug)]
pub(crate) struct Index {
    file: File,
    mmap: MmapMut,
    /// Logical size: bytes of real entries, excluding pre-allocated tail.
    size: u64,
    path: PathBuf,
}

impl Index {
    /// Opens (creating if absent) the index file and maps it read-write.
    ///
    /// The file's current length becomes the logical size, then the file
    /// is grown to `max_index_bytes` to give the map headroom.
    ///
    /// # Errors
    ///
    /// [`StorageError::IndexMisaligned`] if the persisted length is not a
    /// whole number of entries.
    pub(crate) fn open(path: &Path, max_index_bytes: u64) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let size = file.metadata()?.len();
        if size % ENTRY_WIDTH as u64 != 0 {
            return Err(StorageError::IndexMisaligned {
                size,
                entry_width: ENTRY_WIDTH as u64,
            });
        }

        file.set_len(max_index_bytes)?;

        // SAFETY: the map is private to this Index and lives strictly
        // shorter than `file`; the file is not truncated or remapped while
        // the map is alive.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            file,
            mmap,
            size,
            path: path.to_path_buf(),
        })
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// [`StorageError::IndexFull`] if the entry would not fit in the
    /// pre-allocated region.
    pub(crate) fn write(&mut self, rel_offset: u32, position: u64) -> Result<(), StorageError> {
        if self.size + ENTRY_WIDTH as u64 > self.mmap.len() as u64 {
            return Err(StorageError::IndexFull {
                size: self.size,
                max_bytes: self.mmap.len() as u64,
            });
        }

        // Precondition: entries are dense, so the k-th entry's relative
        // offset must be k.
        debug_assert_eq!(
            u64::from(rel_offset),
            self.entries(),
            "index entries must be written in dense order"
        );

        let at = self.size as usize;
        self.mmap[at..at + OFF_WIDTH].copy_from_slice(&rel_offset.to_be_bytes());
        self.mmap[at + OFF_WIDTH..at + ENTRY_WIDTH].copy_from_slice(&position.to_be_bytes());
        self.size += ENTRY_WIDTH as u64;

        Ok(())
    }

    /// Looks up the entry for a relative offset.
    ///
    /// Returns `None` past the written entries - including on a freshly
    /// created, empty index.
    pub(crate) fn get(&self, rel_offset: u32) -> Option<(u32, u64)> {
        let start = u64::from(rel_offset) * ENTRY_WIDTH as u64;
        if start + ENTRY_WIDTH as u64 > self.size {
            return None;
        }

        let at = start as usize;
        let rel = u32::from_be_bytes(
            self.mmap[at..at + OFF_WIDTH]
                .try_into()
                .expect("slice length equals OFF_WIDTH after bounds check"),
        );
        let position = u64::from_be_bytes(
            self.mmap[at + OFF_WIDTH..at + ENTRY_WIDTH]
                .try_into()
                .expect("slice length equals POS_WIDTH after bounds check"),
        );

        Some((rel, position))
    }

    /// Returns the last written entry, or `None` if the index is empty.
    ///
    /// The owning segment uses this on open to recover its next offset.
    pub(crate) fn last_entry(&self) -> Option<(u32, u64)> {
        let entries = self.entries();
        if entries == 0 {
            None
        } else {
            self.get((entries - 1) as u32)
        }
    }

    /// Number of written entries.
    pub(crate) fn entries(&self) -> u64 {
        self.size / ENTRY_WIDTH as u64
    }

    /// Logical size in bytes (written entries only).
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Flushes the map to disk without closing.
    pub(crate) fn sync(&self) -> Result<(), StorageError> {
        self.mmap.flush()?;
        Ok(())
    }

    /// Flushes, unmaps, and truncates the file back to the written size,
    /// removing the pre-allocated tail so the next open finds real
    /// entries only.
    pub(crate) fn close(self) -> Result<(), StorageError> {
        let Index {
            file, mmap, size, ..
        } = self;

        mmap.flush()?;
        // The map must be gone before the file shrinks under it.
        drop(mmap);

        file.set_len(size)?;
        file.sync_all()?;

        Ok(())
    }

    /// Returns the backing file path.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
