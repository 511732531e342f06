//! # driftlog-types: Core types for driftlog
//!
//! This crate contains the types shared across the driftlog system:
//! - Record addressing ([`Offset`])
//! - The caller contract consumed by transports ([`CommitLog`], [`CommitLogError`])
//!
//! Keeping these in their own crate lets transport layers (RPC servers,
//! replication plumbing) depend on the contract without pulling in the
//! storage engine.

use std::fmt::{self, Debug, Display};
use std::ops::{Add, AddAssign, Sub};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Position of a record within the log.
///
/// Offsets are assigned by the log on append, starting at the configured
/// initial offset (0 by default) and increasing by one per record. They are
/// dense: segment boundaries are invisible in offset space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Offset(u64);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    pub fn new(offset: u64) -> Self {
        Self(offset)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Subtracts `rhs`, stopping at zero instead of wrapping.
    pub fn saturating_sub(self, rhs: u64) -> Self {
        Self(self.0.saturating_sub(rhs))
    }

    /// Distance to `earlier`, or `None` if `earlier` is actually later.
    pub fn checked_sub(self, earlier: Offset) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for Offset {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for Offset {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

/// Distance between two offsets. Panics in debug builds if `rhs > self`.
impl Sub for Offset {
    type Output = u64;
    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert!(rhs.0 <= self.0, "offset underflow: {} - {}", self.0, rhs.0);
        self.0 - rhs.0
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Offset> for u64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

/// The append/read contract transports consume.
///
/// This trait is the seam between the storage engine and whatever serves
/// it over the wire. Implementations block until the operation completes;
/// the engine is synchronous and embeds in the caller's runtime.
///
/// # Why `Bytes` instead of a record type?
///
/// Payloads are opaque to transports. Passing `Bytes` keeps this crate
/// decoupled from the storage engine's record encoding.
pub trait CommitLog: Send + Sync + Debug {
    /// Appends `value` to the log and returns its assigned offset.
    fn append(&self, value: Bytes) -> Result<Offset, CommitLogError>;

    /// Reads the payload stored at `offset`.
    ///
    /// # Errors
    ///
    /// * [`CommitLogError::OffsetOutOfRange`] - `offset` is below the log's
    ///   lowest or above its highest offset. Transports map this to their
    ///   "not found" status.
    /// * [`CommitLogError::Storage`] - disk I/O or format failure.
    fn read(&self, offset: Offset) -> Result<Bytes, CommitLogError>;
}

/// Error returned across the [`CommitLog`] boundary.
///
/// Only [`CommitLogError::OffsetOutOfRange`] is a normal part of the
/// contract; everything else is collapsed into [`CommitLogError::Storage`]
/// and logged with detail by the implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitLogError {
    /// The requested offset is outside the log's current range.
    OffsetOutOfRange(Offset),
    /// Storage-level failure (I/O, corruption).
    Storage,
}

impl Display for CommitLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffsetOutOfRange(offset) => write!(f, "offset {offset} out of range"),
            Self::Storage => write!(f, "storage failure"),
        }
    }
}

impl std::error::Error for CommitLogError {}
