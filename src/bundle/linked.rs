// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Bundle implemented as a linked list of entries, newest first.

use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[cfg(any(test, feature = "diagnostics"))]
use std::sync::atomic::AtomicU64;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use tracing::{debug, trace};

use crate::time::Timestamp;

use super::config::BundleConfig;
use super::entry::BundleEntry;
use super::error::BundleError;
use super::{fatal_corruption, ChainStats, GcStats, VersionHistory};

/// Version history of one pointer field of a host node.
///
/// The chain runs from `head` (newest) to a fixed tail sentinel that stands
/// for "before any recorded update". Timestamps never increase along the
/// chain, and only the head can be pending.
pub struct Bundle<P> {
    head: Atomic<BundleEntry<P>>,
    tail: Atomic<BundleEntry<P>>,
    config: BundleConfig,
    collecting: AtomicBool,
    #[cfg(any(test, feature = "diagnostics"))]
    updates: AtomicU64,
}

impl<P> Bundle<P> {
    /// Creates an empty bundle with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BundleConfig::default())
    }

    /// Creates an empty bundle: allocates the tail sentinel and points the
    /// head at it.
    pub fn with_config(config: BundleConfig) -> Self {
        let tail = Atomic::new(BundleEntry::sentinel());
        Self {
            head: tail.clone(),
            tail,
            config,
            collecting: AtomicBool::new(false),
            #[cfg(any(test, feature = "diagnostics"))]
            updates: AtomicU64::new(0),
        }
    }

    /// Returns the configuration this bundle was created with.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Links `ptr` as the newest version, pending until [`finalize`](Self::finalize).
    ///
    /// The caller must be about to commit exactly one update that makes `ptr`
    /// current, and must call `finalize` with its commit timestamp next. If
    /// another writer's entry is pending, this waits until it is finalized,
    /// then races for the head with a CAS, retrying until it wins.
    pub fn prepare(&self, ptr: P) {
        let guard = &epoch::pin();
        let mut new_entry = Owned::new(BundleEntry::new(Timestamp::PENDING, Some(ptr)));
        let mut retries = 0u32;

        loop {
            let expected = self.head.load(Ordering::Acquire, guard);
            // SAFETY: head is never null after construction, and the guard
            // keeps anything reachable from it allocated.
            let expected_ref = unsafe { expected.deref() };
            self.wait_while_pending(expected_ref, "prepare");
            new_entry.set_next(expected);

            match self.head.compare_exchange_weak(
                expected,
                new_entry,
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            ) {
                Ok(_) => {
                    #[cfg(any(test, feature = "diagnostics"))]
                    self.updates.fetch_add(1, Ordering::Relaxed);
                    if retries > 0 {
                        trace!(retries, "bundle head installed after contention");
                    }
                    return;
                }
                Err(err) => {
                    new_entry = err.new;
                    retries = retries.saturating_add(1);
                }
            }
        }
    }

    /// Publishes the pending head at commit timestamp `ts`.
    ///
    /// `ts` must be a real commit timestamp greater than every timestamp
    /// already finalized on this bundle, and the head must be the entry the
    /// caller linked with `prepare`. Either violation is fatal.
    pub fn finalize(&self, ts: Timestamp) {
        if !ts.is_commit() {
            fatal_corruption(format_args!("finalize called with sentinel timestamp {}", ts));
        }

        let guard = &epoch::pin();
        // SAFETY: see `prepare`.
        let head = unsafe { self.head.load(Ordering::Acquire, guard).deref() };
        if !head.is_pending() {
            fatal_corruption(format_args!(
                "finalize({}) without a pending entry; head is at {}",
                ts,
                head.ts()
            ));
        }

        // SAFETY: a pending entry always links to an older entry or the tail.
        let previous = unsafe { head.next(guard).deref() }.ts();
        if ts <= previous {
            fatal_corruption(format_args!(
                "finalize({}) does not follow previous commit {}",
                ts, previous
            ));
        }

        head.set_ts(ts);
    }

    /// Returns the payload authoritative at `ts`, or `None` if the field had
    /// not been updated at or before `ts`.
    ///
    /// Never takes a lock. If the newest entry is pending the call waits for
    /// it to be finalized, because its timestamp decides whether it is
    /// visible.
    pub fn get_ptr_by_timestamp<'g>(&'g self, ts: Timestamp, guard: &'g Guard) -> Option<&'g P> {
        self.entry_at(ts, guard).ptr()
    }

    /// Like [`get_ptr_by_timestamp`](Self::get_ptr_by_timestamp), pinning
    /// internally and cloning the payload out.
    pub fn get_cloned(&self, ts: Timestamp) -> Option<P>
    where
        P: Clone,
    {
        let guard = &epoch::pin();
        self.get_ptr_by_timestamp(ts, guard).cloned()
    }

    /// Returns the entry authoritative at `ts`; the tail if none is.
    ///
    /// # Panics
    ///
    /// Panics if `guard` was pinned on a collector other than the default
    /// one.
    pub fn entry_at<'g>(&'g self, ts: Timestamp, guard: &'g Guard) -> &'g BundleEntry<P> {
        check_guard(guard);
        let tail = self.tail.load(Ordering::Relaxed, guard);
        let mut curr = self.head.load(Ordering::Acquire, guard);

        // SAFETY: see `prepare`.
        self.wait_while_pending(unsafe { curr.deref() }, "read");

        while curr != tail {
            // SAFETY: every link between head and tail is non-null and
            // protected by `guard`.
            let entry = unsafe { curr.deref() };
            #[cfg(any(test, feature = "diagnostics"))]
            entry.validate(guard);
            if entry.ts() <= ts {
                break;
            }
            curr = entry.next(guard);
        }

        // SAFETY: `curr` is either a chain entry or the tail, both non-null.
        let entry = unsafe { curr.deref() };

        #[cfg(any(test, feature = "diagnostics"))]
        if let Some(deleted) = entry.marked() {
            fatal_corruption(format_args!(
                "read at {} returned entry {} retired at {}",
                ts,
                entry.ts(),
                deleted
            ));
        }

        entry
    }

    /// Validates the shape of the chain.
    ///
    /// Meaningful only while no `prepare`/`finalize` is in flight: it then
    /// verifies that timestamps are distinct and strictly descending from
    /// head to tail, that nothing but the head is pending, and that the tail
    /// is reachable and intact.
    pub fn check_chain(&self, guard: &Guard) -> Result<ChainStats, BundleError> {
        check_guard(guard);
        let tail = self.tail.load(Ordering::Relaxed, guard);
        let mut curr = self.head.load(Ordering::Acquire, guard);
        let mut stats = ChainStats {
            len: 0,
            pending: false,
            newest: None,
            oldest: None,
        };
        let mut previous: Option<Timestamp> = None;

        while curr != tail {
            let position = stats.len;
            // SAFETY: `curr` was loaded under `guard`.
            let Some(entry) = (unsafe { curr.as_ref() }) else {
                return Err(BundleError::TailUnreachable { position });
            };
            let ts = entry.ts();

            if ts.is_pending() {
                if position > 0 {
                    return Err(BundleError::PendingNotAtHead { position });
                }
                stats.pending = true;
            } else if ts.is_null() {
                return Err(BundleError::NullTimestamp { position });
            } else {
                if let Some(newer) = previous {
                    if newer <= ts {
                        return Err(BundleError::OutOfOrder {
                            position,
                            newer,
                            older: ts,
                        });
                    }
                }
                stats.newest.get_or_insert(ts);
                stats.oldest = Some(ts);
                previous = Some(ts);
            }

            stats.len += 1;
            curr = entry.next(guard);
        }

        // SAFETY: the tail is allocated for the lifetime of the bundle.
        let tail = unsafe { tail.deref() };
        if !tail.ts().is_null() {
            return Err(BundleError::CorruptTail(format!("timestamp is {}", tail.ts())));
        }
        if tail.ptr().is_some() {
            return Err(BundleError::CorruptTail("tail carries a payload".into()));
        }
        if !tail.is_tail(guard) {
            return Err(BundleError::CorruptTail("tail has a successor".into()));
        }

        Ok(stats)
    }

    /// Spins, then yields, until `entry` is no longer pending.
    fn wait_while_pending(&self, entry: &BundleEntry<P>, op: &'static str) {
        let mut spins = 0u32;
        let mut rounds = 0u32;

        while entry.is_pending() {
            if spins < self.config.spin_before_yield {
                spins += 1;
                hint::spin_loop();
                continue;
            }

            spins = 0;
            rounds = rounds.saturating_add(1);
            if rounds == self.config.slow_wait_rounds {
                debug!(op, rounds, "bundle head still pending");
            }
            thread::yield_now();
        }
    }

    /// Releases every entry, tail last. Returns how many were freed.
    fn release_chain(&mut self) -> usize {
        // SAFETY: `&mut self` guarantees no other thread can reach the chain.
        let guard = unsafe { epoch::unprotected() };
        let tail = self.tail.swap(Shared::null(), Ordering::Relaxed, guard);
        if tail.is_null() {
            return 0;
        }

        let mut curr = self.head.swap(Shared::null(), Ordering::Relaxed, guard);
        let mut released = 0usize;
        while curr != tail {
            // SAFETY: exclusively owned; each entry is released exactly once.
            let next = unsafe { curr.deref() }.next(guard);
            drop(unsafe { curr.into_owned() });
            released += 1;
            curr = next;
        }

        // SAFETY: as above.
        drop(unsafe { tail.into_owned() });
        released + 1
    }
}

impl<P: Send + 'static> Bundle<P> {
    /// Unlinks every version older than the one authoritative at `safe_ts`.
    ///
    /// The entry visible at `safe_ts` is relinked straight to the tail. Each
    /// detached entry is marked retired at `safe_ts` and destroyed once every
    /// reader pinned now has unpinned. Results for queries at `safe_ts` or
    /// later are unchanged; the caller must ensure no query older than
    /// `safe_ts` starts once collection begins. Like a read, collection
    /// waits for a pending head to be finalized, so a thread must not call
    /// `gc` between its own `prepare` and `finalize` on this bundle; it
    /// would wait forever.
    ///
    /// Concurrent collections on the same bundle do not interleave: a call
    /// that finds another in progress returns empty stats immediately.
    ///
    /// # Panics
    ///
    /// Panics if `guard` was pinned on a collector other than the default
    /// one: detached entries must outlive every reader, and readers pin
    /// the default collector.
    pub fn gc(&self, safe_ts: Timestamp, guard: &Guard) -> GcStats {
        check_guard(guard);
        let mut stats = GcStats::default();

        if self
            .collecting
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            trace!(safe_ts = %safe_ts, "bundle gc already running");
            return stats;
        }

        let tail = self.tail.load(Ordering::Relaxed, guard);
        let mut keep = self.head.load(Ordering::Acquire, guard);
        // SAFETY: see `prepare`.
        self.wait_while_pending(unsafe { keep.deref() }, "gc");

        while keep != tail {
            stats.versions_scanned += 1;
            // SAFETY: protected by `guard`.
            let entry = unsafe { keep.deref() };
            if entry.ts() <= safe_ts {
                break;
            }
            keep = entry.next(guard);
        }

        if keep != tail {
            // SAFETY: `keep` is a live chain entry.
            let keep_ref = unsafe { keep.deref() };
            let mut curr = keep_ref.next(guard);
            keep_ref.set_next(tail);

            while curr != tail {
                stats.versions_scanned += 1;
                // SAFETY: detached entries are only destroyed after `guard`
                // and every other current pin is released.
                let entry = unsafe { curr.deref() };
                entry.mark(safe_ts);
                let next = entry.next(guard);
                // SAFETY: `curr` is unreachable from head now, and no other
                // collection can reach it because `collecting` is held.
                unsafe { guard.defer_destroy(curr) };
                stats.versions_retired += 1;
                curr = next;
            }
        }

        self.collecting.store(false, Ordering::Release);

        if stats.versions_retired > 0 {
            trace!(
                safe_ts = %safe_ts,
                retired = stats.versions_retired,
                "bundle gc detached old versions"
            );
        }
        stats
    }
}

#[cfg(any(test, feature = "diagnostics"))]
impl<P> Bundle<P> {
    /// Number of entries linked by `prepare` since construction.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Renders the chain head to tail, one entry per line.
    pub fn dump(&self, guard: &Guard) -> String
    where
        P: std::fmt::Debug,
    {
        use std::fmt::Write;

        check_guard(guard);
        let tail = self.tail.load(Ordering::Relaxed, guard);
        let mut curr = self.head.load(Ordering::Acquire, guard);
        let mut out = String::new();
        let mut position = 0usize;

        while !curr.is_null() {
            // SAFETY: protected by `guard`.
            let entry = unsafe { curr.deref() };
            let label = if curr == tail { "tail" } else { "entry" };
            let _ = write!(out, "[{}] {} ts={} ptr={:?}", position, label, entry.ts(), entry.ptr());
            if let Some(deleted) = entry.marked() {
                let _ = write!(out, " retired={}", deleted);
            }
            out.push('\n');
            if curr == tail {
                break;
            }
            position += 1;
            curr = entry.next(guard);
        }
        out
    }
}

/// Rejects guards pinned on a collector other than the default one.
///
/// `prepare`, `finalize` and every internal wait pin the default collector,
/// so entries retired through any other collector could be freed under a
/// live reader. Unprotected guards carry no collector and pass.
#[inline]
fn check_guard(guard: &Guard) {
    if let Some(collector) = guard.collector() {
        assert!(
            collector == epoch::default_collector(),
            "bundle accessed with a guard from a foreign collector"
        );
    }
}

impl<P> Default for Bundle<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Drop for Bundle<P> {
    fn drop(&mut self) {
        let released = self.release_chain();
        trace!(released, "bundle released");
    }
}

impl<P> std::fmt::Debug for Bundle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P: Send + Sync> VersionHistory<P> for Bundle<P> {
    fn prepare(&self, ptr: P) {
        Bundle::prepare(self, ptr);
    }

    fn finalize(&self, ts: Timestamp) {
        Bundle::finalize(self, ts);
    }

    fn get_ptr_by_timestamp<'g>(&'g self, ts: Timestamp, guard: &'g Guard) -> Option<&'g P> {
        Bundle::get_ptr_by_timestamp(self, ts, guard)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn reads_return_latest_commit_at_or_before(
            gaps in prop::collection::vec(1u64..50, 1..40),
            probes in prop::collection::vec(0u64..2_500, 1..40),
        ) {
            let bundle = Bundle::new();
            let mut commits = Vec::new();
            let mut at = 0u64;
            for (i, gap) in gaps.iter().enumerate() {
                at += gap;
                bundle.prepare(i);
                bundle.finalize(Timestamp::new(at));
                commits.push((at, i));
            }

            let guard = &epoch::pin();
            for probe in probes {
                let expected = commits
                    .iter()
                    .rev()
                    .find(|(at, _)| *at <= probe)
                    .map(|(_, ptr)| *ptr);
                let query = Timestamp::from_raw(probe);
                prop_assert_eq!(bundle.get_ptr_by_timestamp(query, guard).copied(), expected);
            }
        }

        #[test]
        fn quiescent_chain_is_strictly_descending(count in 0usize..64) {
            let bundle = Bundle::new();
            for i in 0..count {
                bundle.prepare(i);
                bundle.finalize(Timestamp::new(i as u64 + 1));
            }

            let guard = &epoch::pin();
            let stats = bundle.check_chain(guard).unwrap();
            prop_assert_eq!(stats.len, count);
            prop_assert!(!stats.pending);
        }

        #[test]
        fn gc_preserves_reads_at_or_after_safe_ts(
            count in 1u64..40,
            safe in 1u64..40,
        ) {
            let bundle = Bundle::new();
            for k in 1..=count {
                bundle.prepare(k);
                bundle.finalize(Timestamp::new(k * 2));
            }

            let guard = &epoch::pin();
            let safe_ts = Timestamp::new(safe * 2);
            let before: Vec<_> = (safe * 2..=count * 2 + 1)
                .map(|t| bundle.get_ptr_by_timestamp(Timestamp::new(t), guard).copied())
                .collect();

            bundle.gc(safe_ts, guard);
            prop_assert!(bundle.check_chain(guard).is_ok());

            let after: Vec<_> = (safe * 2..=count * 2 + 1)
                .map(|t| bundle.get_ptr_by_timestamp(Timestamp::new(t), guard).copied())
                .collect();
            prop_assert_eq!(before, after);
        }
    }
}
