//! Identifier generator tests under concurrency and controlled clocks.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tenantry_persistence::error::{IdError, StorageError};
use tenantry_persistence::ids::{Clock, DEFAULT_EPOCH_MS, IdGenerator, IdGeneratorConfig, IdParts};

/// A clock the test moves by hand.
#[derive(Debug)]
struct ManualClock(AtomicU64);

impl ManualClock {
    fn at(ms: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(ms)))
    }

    fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn test_concurrent_ids_are_distinct() {
    let ids = Arc::new(IdGenerator::new(IdGeneratorConfig::new(1, 2)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ids = Arc::clone(&ids);
            thread::spawn(move || {
                let mut issued = Vec::with_capacity(2_000);
                for _ in 0..2_000 {
                    issued.push(ids.next().unwrap());
                }
                issued
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        let issued = handle.join().unwrap();
        // Each thread observes its own calls completing in order.
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
        for id in issued {
            assert!(all.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(all.len(), 16_000);
}

#[test]
fn test_later_clock_reading_gives_larger_ids() {
    let start = DEFAULT_EPOCH_MS + 5_000;
    let clock = ManualClock::at(start);
    let ids = IdGenerator::with_clock(IdGeneratorConfig::default(), clock.clone()).unwrap();

    let early: Vec<i64> = (0..100).map(|_| ids.next().unwrap()).collect();
    clock.set(start + 1);
    let late: Vec<i64> = (0..100).map(|_| ids.next().unwrap()).collect();

    let max_early = early.iter().max().unwrap();
    let min_late = late.iter().min().unwrap();
    assert!(min_late > max_early);
    assert_eq!(ids.decode(*min_late).timestamp_ms, start + 1);
    assert_eq!(ids.decode(*min_late).sequence, 0);
}

#[test]
fn test_clock_regression_is_fatal() {
    let start = DEFAULT_EPOCH_MS + 10_000;
    let clock = ManualClock::at(start);
    let ids = IdGenerator::with_clock(IdGeneratorConfig::default(), clock.clone()).unwrap();

    ids.next().unwrap();
    clock.set(start - 5);

    let err = ids.next().unwrap_err();
    assert_eq!(
        err,
        IdError::ClockRegression {
            last_ms: start,
            now_ms: start - 5,
        }
    );

    let storage: StorageError = err.into();
    assert!(storage.is_hard_failure());
    assert!(!storage.public_message().contains("5ms"));

    // Issuing resumes once the clock catches up.
    clock.set(start + 1);
    assert!(ids.next().is_ok());
}

#[test]
fn test_ids_carry_node_fields() {
    let ids = IdGenerator::new(IdGeneratorConfig::new(17, 29)).unwrap();
    let parts = ids.decode(ids.next().unwrap());
    assert_eq!(parts.datacenter_id, 17);
    assert_eq!(parts.worker_id, 29);
}

#[test]
fn test_layout_is_bit_exact() {
    // 1 ms after the epoch, datacenter 1, worker 1, sequence 1.
    let parts = IdParts {
        timestamp_ms: DEFAULT_EPOCH_MS + 1,
        datacenter_id: 1,
        worker_id: 1,
        sequence: 1,
    };
    let id = parts.compose(DEFAULT_EPOCH_MS);
    assert_eq!(id, (1 << 22) | (1 << 17) | (1 << 12) | 1);
    assert_eq!(IdParts::decode(id, DEFAULT_EPOCH_MS), parts);
}
