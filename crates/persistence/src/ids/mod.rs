//! Time-ordered 64-bit record identifiers.
//!
//! [`IdGenerator`] issues identifiers laid out as described in [`layout`]:
//! milliseconds since a fixed epoch, a datacenter id, a worker id and a
//! per-millisecond sequence. Identifiers issued by one generator are unique
//! and strictly increasing.
//!
//! Datacenter and worker ids are static configuration. Giving every process a
//! distinct `(datacenter_id, worker_id)` pair is an operational precondition;
//! nothing here coordinates it.
//!
//! # Clock regression
//!
//! If the clock reads earlier than the last issued timestamp, [`IdGenerator::next`]
//! fails with [`IdError::ClockRegression`] instead of risking a duplicate or
//! out-of-order identifier.
//!
//! ```
//! use tenantry_persistence::ids::{IdGenerator, IdGeneratorConfig};
//!
//! let ids = IdGenerator::new(IdGeneratorConfig::default()).unwrap();
//! let a = ids.next().unwrap();
//! let b = ids.next().unwrap();
//! assert!(b > a);
//! ```

mod clock;
pub mod layout;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::IdError;

pub use clock::{Clock, SystemClock};
pub use layout::{DEFAULT_EPOCH_MS, IdParts, MAX_DATACENTER_ID, MAX_SEQUENCE, MAX_WORKER_ID};

use layout::MAX_TIMESTAMP;

/// Static configuration of an identifier generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGeneratorConfig {
    /// Datacenter id (0..=31).
    #[serde(default)]
    pub datacenter_id: u8,

    /// Worker id (0..=31).
    #[serde(default)]
    pub worker_id: u8,

    /// Epoch in milliseconds since the Unix epoch.
    #[serde(default = "default_epoch_ms")]
    pub epoch_ms: u64,
}

fn default_epoch_ms() -> u64 {
    DEFAULT_EPOCH_MS
}

impl Default for IdGeneratorConfig {
    fn default() -> Self {
        Self {
            datacenter_id: 0,
            worker_id: 0,
            epoch_ms: default_epoch_ms(),
        }
    }
}

impl IdGeneratorConfig {
    /// Creates a configuration for the given node.
    pub fn new(datacenter_id: u8, worker_id: u8) -> Self {
        Self {
            datacenter_id,
            worker_id,
            ..Default::default()
        }
    }

    /// Checks that both node ids fit their fields.
    pub fn validate(&self) -> Result<(), IdError> {
        if self.datacenter_id > MAX_DATACENTER_ID {
            return Err(IdError::InvalidNodeId {
                field: "datacenter_id",
                value: self.datacenter_id,
                max: MAX_DATACENTER_ID,
            });
        }
        if self.worker_id > MAX_WORKER_ID {
            return Err(IdError::InvalidNodeId {
                field: "worker_id",
                value: self.worker_id,
                max: MAX_WORKER_ID,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u16,
}

/// Issues unique, time-ordered identifiers.
///
/// All mutable state sits behind one short mutex; `next` holds it for a
/// constant number of steps unless the sequence for the current millisecond
/// is exhausted, in which case it spins until the clock advances.
#[derive(Debug)]
pub struct IdGenerator {
    config: IdGeneratorConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    /// Creates a generator reading the system clock.
    pub fn new(config: IdGeneratorConfig) -> Result<Self, IdError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a generator reading the given clock.
    pub fn with_clock(config: IdGeneratorConfig, clock: Arc<dyn Clock>) -> Result<Self, IdError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IdGeneratorConfig {
        &self.config
    }

    /// Issues the next identifier.
    pub fn next(&self) -> Result<i64, IdError> {
        let mut state = self.state.lock();

        let mut timestamp = self.clock.now_millis();
        if timestamp < state.last_timestamp {
            tracing::error!(
                last_ms = state.last_timestamp,
                now_ms = timestamp,
                "Clock moved backwards; refusing to issue identifiers"
            );
            return Err(IdError::ClockRegression {
                last_ms: state.last_timestamp,
                now_ms: timestamp,
            });
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                timestamp = self.wait_next_millis(state.last_timestamp);
            }
        } else {
            state.sequence = 0;
        }

        let parts = IdParts {
            timestamp_ms: timestamp,
            datacenter_id: self.config.datacenter_id,
            worker_id: self.config.worker_id,
            sequence: state.sequence,
        };
        self.check_timestamp(timestamp)?;
        state.last_timestamp = timestamp;

        Ok(parts.compose(self.config.epoch_ms))
    }

    /// Splits an identifier issued under this generator's epoch.
    pub fn decode(&self, id: i64) -> IdParts {
        IdParts::decode(id, self.config.epoch_ms)
    }

    fn check_timestamp(&self, timestamp: u64) -> Result<(), IdError> {
        if timestamp < self.config.epoch_ms {
            return Err(IdError::BeforeEpoch {
                now_ms: timestamp,
                epoch_ms: self.config.epoch_ms,
            });
        }
        let elapsed = timestamp - self.config.epoch_ms;
        if elapsed > MAX_TIMESTAMP {
            return Err(IdError::TimestampOverflow {
                elapsed_ms: elapsed,
            });
        }
        Ok(())
    }

    fn wait_next_millis(&self, last_timestamp: u64) -> u64 {
        let mut timestamp = self.clock.now_millis();
        while timestamp <= last_timestamp {
            std::hint::spin_loop();
            timestamp = self.clock.now_millis();
        }
        timestamp
    }
}
