//! driftlog-storage: Segmented append-only commit log
//!
//! This crate implements the driftlog storage engine. Records are opaque
//! byte payloads; each append assigns the next offset in a dense,
//! monotonically increasing sequence, and the record becomes immutable.
//! Reads address records by offset.
//!
//! # On-Disk Layout
//!
//! The log owns a directory of segment files. Each segment is a pair:
//!
//! ```text
//! {dir}/
//!   ├── 0.store       <- length-prefixed record payloads
//!   ├── 0.index       <- memory-mapped (relative offset, position) pairs
//!   ├── 1024.store    <- next segment, named by its base offset
//!   └── 1024.index
//! ```
//!
//! Store entry: `[length:u64][encoded record]`. The length is big-endian
//! and counts the encoded record bytes that follow.
//!
//! Index entry: `[relative offset:u32][store position:u64]`, both
//! big-endian, packed with no header. The relative offset is the record's
//! absolute offset minus the segment's base offset.
//!
//! Record encoding: `[offset:u64][length:u32][value][crc32:u32]`, all
//! integers big-endian, CRC over the preceding bytes.
//!
//! # Write Path
//!
//! `Log::append` routes to the active (last) segment. The segment stamps
//! the record with the next offset, appends the encoding to its store, and
//! writes an index entry pointing at the store position. When the active
//! segment reaches either of its configured size caps, the log rolls a new
//! segment whose base offset is the next offset to assign.
//!
//! # Read Path
//!
//! `Log::read` binary-searches the segment list by base offset, then the
//! owning segment resolves offset → store position through its index and
//! decodes the record from the store.
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use driftlog_storage::{Config, Log};
//!
//! let log = Log::open("/data/driftlog", Config::default())?;
//!
//! let offset = log.append(Bytes::from("hello world"))?;
//! let record = log.read(offset)?;
//! assert_eq!(record.value().as_ref(), b"hello world");
//! ```

mod config;
mod error;
mod index;
mod log;
mod record;
mod segment;
mod store;

pub use config::{Config, SegmentConfig};
pub use error::StorageError;
pub use log::{Log, LogReader};
pub use record::Record;
