//! Bit layout of record identifiers.
//!
//! ```text
//!  63      62 ........................ 22  21 ... 17  16 ... 12  11 ........ 0
//! +-------+------------------------------+-----------+-----------+-------------+
//! | 0     | timestamp (41 bits, ms)      | dc (5)    | worker (5)| seq (12)    |
//! +-------+------------------------------+-----------+-----------+-------------+
//! ```
//!
//! The timestamp is relative to [`DEFAULT_EPOCH_MS`] unless configured
//! otherwise. The layout is part of the persisted format and must not change.

use serde::{Deserialize, Serialize};

/// Default identifier epoch: 2010-11-04T01:42:54.657Z.
pub const DEFAULT_EPOCH_MS: u64 = 1_288_834_974_657;

/// Width of the timestamp field.
pub const TIMESTAMP_BITS: u32 = 41;
/// Width of the datacenter field.
pub const DATACENTER_BITS: u32 = 5;
/// Width of the worker field.
pub const WORKER_BITS: u32 = 5;
/// Width of the sequence field.
pub const SEQUENCE_BITS: u32 = 12;

/// Largest datacenter id.
pub const MAX_DATACENTER_ID: u8 = (1 << DATACENTER_BITS) - 1;
/// Largest worker id.
pub const MAX_WORKER_ID: u8 = (1 << WORKER_BITS) - 1;
/// Largest per-millisecond sequence value.
pub const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
/// Largest representable elapsed time since the epoch.
pub const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

pub(crate) const WORKER_SHIFT: u32 = SEQUENCE_BITS;
pub(crate) const DATACENTER_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS;
pub(crate) const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS + DATACENTER_BITS;

/// The fields of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdParts {
    /// Absolute timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Datacenter id.
    pub datacenter_id: u8,
    /// Worker id.
    pub worker_id: u8,
    /// Per-millisecond sequence.
    pub sequence: u16,
}

impl IdParts {
    /// Packs the fields into an identifier, given the epoch they are relative to.
    ///
    /// The caller guarantees every field is in range.
    pub fn compose(&self, epoch_ms: u64) -> i64 {
        let elapsed = self.timestamp_ms - epoch_ms;
        ((elapsed << TIMESTAMP_SHIFT)
            | ((self.datacenter_id as u64) << DATACENTER_SHIFT)
            | ((self.worker_id as u64) << WORKER_SHIFT)
            | self.sequence as u64) as i64
    }

    /// Splits an identifier into its fields.
    ///
    /// ```
    /// use tenantry_persistence::ids::{IdParts, DEFAULT_EPOCH_MS};
    ///
    /// let parts = IdParts {
    ///     timestamp_ms: DEFAULT_EPOCH_MS + 1_000,
    ///     datacenter_id: 3,
    ///     worker_id: 7,
    ///     sequence: 42,
    /// };
    /// let id = parts.compose(DEFAULT_EPOCH_MS);
    /// assert_eq!(IdParts::decode(id, DEFAULT_EPOCH_MS), parts);
    /// ```
    pub fn decode(id: i64, epoch_ms: u64) -> Self {
        let raw = id as u64;
        Self {
            timestamp_ms: (raw >> TIMESTAMP_SHIFT) + epoch_ms,
            datacenter_id: ((raw >> DATACENTER_SHIFT) & MAX_DATACENTER_ID as u64) as u8,
            worker_id: ((raw >> WORKER_SHIFT) & MAX_WORKER_ID as u64) as u8,
            sequence: (raw & MAX_SEQUENCE as u64) as u16,
        }
    }
}
