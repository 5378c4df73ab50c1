// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Hybrid Logical Clock (HLC) oracle.
//!
//! HLC combines physical time with a logical counter to provide strictly
//! increasing commit timestamps even when the wall clock stalls or steps
//! backwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Timestamp, TimestampOracle};

/// Hybrid Logical Clock timestamp oracle.
///
/// Commit timestamps are nanoseconds since the Unix epoch, bumped by one
/// whenever the physical clock has not advanced past the last issued value.
/// Guarantees that each call to `next_commit()` returns a timestamp greater than
/// all previous calls, even under concurrent access.
pub struct HlcOracle {
    last_timestamp: AtomicU64,
}

impl HlcOracle {
    /// Creates a new HLC oracle.
    pub fn new() -> Self {
        Self {
            last_timestamp: AtomicU64::new(Timestamp::NULL.as_u64()),
        }
    }

    fn physical_time_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

impl Default for HlcOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampOracle for HlcOracle {
    fn next_commit(&self) -> Timestamp {
        loop {
            let physical = Self::physical_time_nanos();
            let last = self.last_timestamp.load(Ordering::Acquire);
            let new_ts = physical
                .max(last.saturating_add(1))
                .clamp(Timestamp::MIN.as_u64(), Timestamp::MAX.as_u64());

            match self.last_timestamp.compare_exchange(
                last,
                new_ts,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Timestamp::new(new_ts),
                Err(_) => continue,
            }
        }
    }

    fn read_timestamp(&self) -> Timestamp {
        // Reserve the value so every later commit lands strictly above it,
        // even if the wall clock steps backwards in between.
        let ts = Self::physical_time_nanos().clamp(Timestamp::MIN.as_u64(), Timestamp::MAX.as_u64());
        let last = self.last_timestamp.fetch_max(ts, Ordering::AcqRel);
        Timestamp::new(ts.max(last))
    }

    #[inline]
    fn name(&self) -> &'static str {
        "HLC"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hlc_monotonic() {
        let hlc = HlcOracle::new();
        let mut last = hlc.next_commit();

        for _ in 0..1000 {
            let current = hlc.next_commit();
            assert!(
                current > last,
                "HLC must be strictly increasing: {} > {}",
                current,
                last
            );
            last = current;
        }
    }

    #[test]
    fn test_hlc_concurrent_monotonic() {
        use std::sync::Arc;
        use std::thread;

        let hlc = Arc::new(HlcOracle::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let hlc = Arc::clone(&hlc);
            handles.push(thread::spawn(move || {
                let mut last = hlc.next_commit();
                for _ in 0..1000 {
                    let current = hlc.next_commit();
                    assert!(
                        current > last,
                        "per-thread monotonicity: {} > {}",
                        current,
                        last
                    );
                    last = current;
                }
            }));
        }

        for handle in handles {
            handle.join().expect("thread panicked");
        }
    }

    #[test]
    fn test_hlc_unique_across_threads() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let hlc = Arc::new(HlcOracle::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hlc = Arc::clone(&hlc);
                thread::spawn(move || (0..1000).map(|_| hlc.next_commit()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for ts in handle.join().unwrap() {
                assert!(seen.insert(ts), "duplicate commit timestamp {}", ts);
            }
        }
        assert_eq!(seen.len(), 8000);
    }

    #[test]
    fn test_read_timestamp_covers_commits() {
        let hlc = HlcOracle::new();
        let commit = hlc.next_commit();
        assert!(hlc.read_timestamp() >= commit);
    }

    #[test]
    fn test_commit_after_read_is_later() {
        let hlc = HlcOracle::new();
        for _ in 0..1000 {
            let at = hlc.read_timestamp();
            assert!(hlc.next_commit() > at);
        }
    }

    #[test]
    fn test_read_reserves_timestamp_when_clock_lags() {
        // Last commit far ahead of the wall clock, as after a backward step.
        let ahead = HlcOracle::physical_time_nanos() + 3_600_000_000_000;
        let hlc = HlcOracle {
            last_timestamp: AtomicU64::new(ahead),
        };

        let at = hlc.read_timestamp();
        assert_eq!(at, Timestamp::new(ahead));
        assert!(hlc.next_commit() > at);
    }

    #[test]
    fn test_hlc_name() {
        assert_eq!(HlcOracle::new().name(), "HLC");
    }
}
