//! Append-only store file.
//!
//! The store holds the raw record bytes of one segment. Each entry is a
//! big-endian `u64` length prefix followed by that many payload bytes, and
//! is addressed by the byte position where its prefix begins.
//!
//! Writes go through a buffered writer; the logical `size` runs ahead of
//! the file on disk until the buffer flushes. Every read flushes first so
//! it observes buffered entries. A single mutex serializes appends against
//! each other and against that flush.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::StorageError;

/// Width of the big-endian length prefix on every store entry.
pub(crate) const LEN_WIDTH: u64 = 8;

/// Append-only, length-prefixed blob file.
#[derive(Debug)]
pub(crate) struct Store {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    writer: BufWriter<File>,
    /// Logical size: bytes appended, flushed or not.
    size: u64,
}

impl Store {
    /// Opens (creating if absent) the store file in append mode.
    ///
    /// The logical size starts at the file's current length, so a store
    /// reopened over existing data appends after it.
    pub(crate) fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
            }),
        })
    }

    /// Appends `encoded` as one length-prefixed entry.
    ///
    /// Returns `(bytes_written, position)`: the total bytes the entry
    /// occupies (prefix included) and the byte position where it starts.
    pub(crate) fn append(&self, encoded: &[u8]) -> Result<(u64, u64), StorageError> {
        let mut inner = self.lock();

        let position = inner.size;
        inner
            .writer
            .write_all(&(encoded.len() as u64).to_be_bytes())?;
        inner.writer.write_all(encoded)?;

        let written = LEN_WIDTH + encoded.len() as u64;
        inner.size += written;

        Ok((written, position))
    }

    /// Reads the entry whose length prefix begins at `position`.
    ///
    /// # Errors
    ///
    /// [`StorageError::StoreCorrupted`] if `position` or the length prefix
    /// found there reaches past the logical end of the store.
    pub(crate) fn read(&self, position: u64) -> Result<Bytes, StorageError> {
        let mut inner = self.lock();
        inner.writer.flush()?;

        if position + LEN_WIDTH > inner.size {
            return Err(StorageError::StoreCorrupted {
                position,
                size: inner.size,
            });
        }

        let file = inner.writer.get_ref();

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact_at(&mut len_buf, position)?;
        let length = u64::from_be_bytes(len_buf);

        if position + LEN_WIDTH + length > inner.size {
            return Err(StorageError::StoreCorrupted {
                position,
                size: inner.size,
            });
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact_at(&mut payload, position + LEN_WIDTH)?;

        Ok(Bytes::from(payload))
    }

    /// Reads raw store bytes at `offset` into `buf`, returning the count
    /// read. Returns 0 at or past the logical end. Supports sequential
    /// streaming of the whole file.
    pub(crate) fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, StorageError> {
        let mut inner = self.lock();
        inner.writer.flush()?;

        if offset >= inner.size {
            return Ok(0);
        }

        let n = buf.len().min((inner.size - offset) as usize);
        inner.writer.get_ref().read_exact_at(&mut buf[..n], offset)?;

        Ok(n)
    }

    /// Logical size in bytes, including buffered writes.
    pub(crate) fn size(&self) -> u64 {
        self.lock().size
    }

    /// Flushes buffered writes and fsyncs the file.
    pub(crate) fn sync(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Flushes buffered writes ahead of closing. The file handle itself
    /// closes on drop.
    pub(crate) fn close(&self) -> Result<(), StorageError> {
        self.sync()
    }

    /// Returns the backing file path.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
