//! Storage engine configuration.

use serde::{Deserialize, Serialize};

/// Default cap for store and index files: 1 GiB.
const DEFAULT_MAX_BYTES: u64 = 1024 * 1024 * 1024;

/// Top-level configuration for a [`Log`](crate::Log).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub segment: SegmentConfig,
}

/// Per-segment size caps and the log's starting offset.
///
/// Zero caps are replaced with the documented defaults when the log opens,
/// so a partially filled-in config behaves the same as one built from
/// `Default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Cap on a segment's store file, in bytes. A segment whose store has
    /// reached this size stops accepting appends.
    pub max_store_bytes: u64,

    /// Cap on a segment's index file, in bytes. The index pre-allocates
    /// and memory-maps exactly this much at segment creation; it is the
    /// hard upper bound on the segment's record count (12 bytes per
    /// record).
    pub max_index_bytes: u64,

    /// Offset assigned to the first record of a brand-new log.
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_MAX_BYTES,
            max_index_bytes: DEFAULT_MAX_BYTES,
            initial_offset: 0,
        }
    }
}

impl Config {
    /// Replaces zero caps with the documented defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.segment.max_store_bytes == 0 {
            self.segment.max_store_bytes = DEFAULT_MAX_BYTES;
        }
        if self.segment.max_index_bytes == 0 {
            self.segment.max_index_bytes = DEFAULT_MAX_BYTES;
        }
        self
    }
}
