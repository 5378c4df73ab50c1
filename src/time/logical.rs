// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Pure logical-counter oracle.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{Timestamp, TimestampOracle};

/// Timestamp oracle backed by a single atomic counter.
///
/// Commit timestamps are 1, 2, 3, ... with no relation to wall-clock time.
/// Deterministic, which makes it the oracle of choice for tests and benches.
#[derive(Debug)]
pub struct LogicalOracle {
    counter: AtomicU64,
}

impl LogicalOracle {
    /// Creates an oracle whose first commit timestamp is [`Timestamp::MIN`].
    pub fn new() -> Self {
        Self::starting_after(Timestamp::NULL)
    }

    /// Creates an oracle whose first commit timestamp follows `last`.
    pub fn starting_after(last: Timestamp) -> Self {
        Self {
            counter: AtomicU64::new(last.as_u64()),
        }
    }
}

impl Default for LogicalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampOracle for LogicalOracle {
    #[inline]
    fn next_commit(&self) -> Timestamp {
        let value = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        assert!(
            value <= Timestamp::MAX.as_u64(),
            "logical oracle exhausted"
        );
        Timestamp::new(value)
    }

    #[inline]
    fn read_timestamp(&self) -> Timestamp {
        // NULL before the first commit, which reads every bundle at its tail.
        Timestamp::from_raw(self.counter.load(Ordering::Acquire))
    }

    #[inline]
    fn name(&self) -> &'static str {
        "logical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_from_one() {
        let oracle = LogicalOracle::new();
        assert_eq!(oracle.next_commit(), Timestamp::new(1));
        assert_eq!(oracle.next_commit(), Timestamp::new(2));
        assert_eq!(oracle.read_timestamp(), Timestamp::new(2));
    }

    #[test]
    fn test_starting_after() {
        let oracle = LogicalOracle::starting_after(Timestamp::new(99));
        assert_eq!(oracle.next_commit(), Timestamp::new(100));
    }

    #[test]
    fn test_read_before_any_commit() {
        let oracle = LogicalOracle::new();
        assert_eq!(oracle.read_timestamp(), Timestamp::NULL);
        assert!(oracle.next_commit() > Timestamp::NULL);
    }

    #[test]
    fn test_commit_after_read_is_later() {
        let oracle = LogicalOracle::new();
        for _ in 0..100 {
            let at = oracle.read_timestamp();
            assert!(oracle.next_commit() > at);
        }
    }

    #[test]
    fn stress_logical_contention() {
        use std::sync::Arc;
        use std::thread;

        let oracle = Arc::new(LogicalOracle::new());
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let oracle = Arc::clone(&oracle);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let _ = oracle.next_commit();
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(oracle.read_timestamp(), Timestamp::new(160_000));
    }
}
