//! The log: an ordered collection of segments.
//!
//! The log owns a directory of segment file pairs and routes every
//! operation to the right segment: appends to the active (last) segment,
//! rolling a new one when it fills; reads to the unique segment whose
//! offset range contains the requested offset. Segment boundaries are
//! invisible to callers - offsets are dense across rollovers.
//!
//! A read/write lock guards the segment list: `append`, `truncate`, and
//! rollover take the write side, reads and offset queries the read side,
//! so concurrent readers proceed while writers serialize.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use driftlog_types::{CommitLog, CommitLogError, Offset};

use crate::config::Config;
use crate::record::Record;
use crate::segment::Segment;
use crate::StorageError;

/// Append-only, offset-addressed record log over segmented files.
///
/// All state lives in the value; multiple logs on distinct directories
/// coexist freely. The log reconstructs itself from directory contents on
/// open, so it outlives the process.
#[derive(Debug)]
pub struct Log {
    dir: PathBuf,
    config: Config,
    /// Sorted by base offset; the last segment is the active one. Never
    /// empty.
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Opens (creating if absent) the log in `dir`.
    ///
    /// Zero config caps are replaced with the documented defaults. The
    /// directory is scanned for `<base>.store` / `<base>.index` pairs;
    /// segments are rebuilt in base-offset order, and a fresh one is
    /// created at the configured initial offset when none exist.
    pub fn open(dir: impl Into<PathBuf>, config: Config) -> Result<Self, StorageError> {
        let dir = dir.into();
        let config = config.normalized();

        fs::create_dir_all(&dir)?;

        // Both extensions share a base offset; the set collapses the pair.
        let mut bases = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            match base_offset_of(&path) {
                Some(base) => {
                    bases.insert(base);
                }
                None => {
                    tracing::debug!(path = %path.display(), "skipping unrecognized file");
                }
            }
        }

        let mut segments = Vec::with_capacity(bases.len().max(1));
        for base in bases {
            segments.push(Segment::open(&dir, Offset::new(base), &config.segment)?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(
                &dir,
                Offset::new(config.segment.initial_offset),
                &config.segment,
            )?);
        }

        tracing::info!(
            dir = %dir.display(),
            segments = segments.len(),
            lowest = %segments[0].base_offset(),
            next = %segments[segments.len() - 1].next_offset(),
            "log opened"
        );

        Ok(Self {
            dir,
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Appends `value` and returns its assigned offset.
    ///
    /// When the active segment is maxed, a new segment is rolled at the
    /// next offset to assign before the append lands.
    pub fn append(&self, value: Bytes) -> Result<Offset, StorageError> {
        let mut segments = self.write_lock();

        let active = segments.last().expect("log always has an active segment");
        if active.is_maxed() {
            let base = active.next_offset();
            tracing::debug!(base = %base, "rolling new segment");
            segments.push(Segment::open(&self.dir, base, &self.config.segment)?);
        }

        segments
            .last_mut()
            .expect("log always has an active segment")
            .append(value)
    }

    /// Reads the record at `offset`.
    ///
    /// # Errors
    ///
    /// [`StorageError::OffsetOutOfRange`] if no segment owns the offset.
    pub fn read(&self, offset: Offset) -> Result<Record, StorageError> {
        let segments = self.read_lock();

        find_segment(&segments, offset)
            .ok_or(StorageError::OffsetOutOfRange(offset))?
            .read(offset)
    }

    /// The smallest offset still stored.
    pub fn lowest_offset(&self) -> Offset {
        self.read_lock()[0].base_offset()
    }

    /// The largest offset assigned so far; zero when the log is empty.
    pub fn highest_offset(&self) -> Offset {
        let segments = self.read_lock();
        segments[segments.len() - 1].next_offset().saturating_sub(1)
    }

    /// Removes every segment that lies entirely below `lowest`, deleting
    /// its files.
    ///
    /// A record at offset `lowest` itself survives. Truncating past the
    /// end of the log is a caller error; the engine recovers by starting a
    /// fresh active segment at the watermark so that at least one segment
    /// always exists.
    pub fn truncate(&self, lowest: Offset) -> Result<(), StorageError> {
        let mut segments = self.write_lock();

        let mut retained = Vec::with_capacity(segments.len());
        for segment in segments.drain(..) {
            if segment.next_offset().saturating_sub(1) < lowest {
                segment.remove()?;
            } else {
                retained.push(segment);
            }
        }

        if retained.is_empty() {
            tracing::warn!(lowest = %lowest, "truncated past end of log; starting fresh segment");
            retained.push(Segment::open(&self.dir, lowest, &self.config.segment)?);
        }

        *segments = retained;
        Ok(())
    }

    /// Returns a reader over the raw store bytes of every segment, in
    /// base-offset order: the length-prefixed record encodings exactly as
    /// they sit on disk. Intended for replication and backup.
    pub fn reader(&self) -> LogReader<'_> {
        LogReader {
            log: self,
            segment: 0,
            position: 0,
        }
    }

    /// Flushes every segment's store and index to disk.
    pub fn sync(&self) -> Result<(), StorageError> {
        for segment in self.read_lock().iter() {
            segment.sync()?;
        }
        Ok(())
    }

    /// Closes all segments, flushing buffers and truncating each index to
    /// its written size.
    pub fn close(self) -> Result<(), StorageError> {
        let segments = self
            .segments
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        for segment in segments {
            segment.close()?;
        }
        Ok(())
    }

    /// Closes the log and deletes its directory.
    pub fn remove(self) -> Result<(), StorageError> {
        let dir = self.dir.clone();
        self.close()?;
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Vec<Segment>> {
        self.segments.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Vec<Segment>> {
        self.segments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommitLog for Log {
    fn append(&self, value: Bytes) -> Result<Offset, CommitLogError> {
        Log::append(self, value).map_err(Into::into)
    }

    fn read(&self, offset: Offset) -> Result<Bytes, CommitLogError> {
        Log::read(self, offset)
            .map(Record::into_value)
            .map_err(Into::into)
    }
}

/// Binary search for the segment with `base_offset <= offset < next_offset`.
fn find_segment(segments: &[Segment], offset: Offset) -> Option<&Segment> {
    let idx = segments
        .partition_point(|segment| segment.base_offset() <= offset)
        .checked_sub(1)?;

    let segment = &segments[idx];
    (offset < segment.next_offset()).then_some(segment)
}

/// Extracts the base offset from a `<base>.store` / `<base>.index` path.
fn base_offset_of(path: &Path) -> Option<u64> {
    match path.extension()?.to_str()? {
        "store" | "index" => path.file_stem()?.to_str()?.parse().ok(),
        _ => None,
    }
}

/// Sequential reader over the concatenated store files of a [`Log`].
///
/// Tracks `(segment index, position within that segment's store)` and
/// steps to the next segment when the current one is exhausted. Each read
/// takes the log's read lock, so the reader observes the segment list as
/// it stands at that call.
pub struct LogReader<'a> {
    log: &'a Log,
    segment: usize,
    position: u64,
}

impl Read for LogReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let segments = self.log.read_lock();
            let Some(segment) = segments.get(self.segment) else {
                return Ok(0);
            };

            let n = segment
                .store()
                .read_at(buf, self.position)
                .map_err(io::Error::other)?;

            if n == 0 {
                self.segment += 1;
                self.position = 0;
                continue;
            }

            self.position += n as u64;
            return Ok(n);
        }
    }
}
