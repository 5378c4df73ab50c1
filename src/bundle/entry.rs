// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! A single version record in a bundle chain.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_epoch::{Atomic, Guard, Shared};

use crate::time::Timestamp;

use super::fatal_corruption;

/// One version of a host node field.
///
/// An entry records the payload handle `ptr` that became authoritative at
/// commit timestamp `ts`, and links to the next-older entry. While `ts` is
/// [`Timestamp::PENDING`] the entry is linked but invisible to ordering; once a
/// real timestamp is stored, `ts` and `ptr` never change again. The retirement
/// marker may be set once afterwards.
///
/// Accessors are not synchronized against each other; the owning
/// [`Bundle`](super::Bundle) is responsible for publishing entries safely.
pub struct BundleEntry<P> {
    ts: AtomicU64,
    ptr: Option<P>,
    next: Atomic<BundleEntry<P>>,
    deleted_ts: AtomicU64,
}

impl<P> BundleEntry<P> {
    pub(crate) fn new(ts: Timestamp, ptr: Option<P>) -> Self {
        Self {
            ts: AtomicU64::new(ts.as_u64()),
            ptr,
            next: Atomic::null(),
            deleted_ts: AtomicU64::new(Timestamp::NULL.as_u64()),
        }
    }

    /// The tail sentinel: null timestamp, no payload, no successor.
    pub(crate) fn sentinel() -> Self {
        Self::new(Timestamp::NULL, None)
    }

    /// Commit timestamp, or a sentinel.
    #[inline]
    pub fn ts(&self) -> Timestamp {
        Timestamp::from_raw(self.ts.load(Ordering::Acquire))
    }

    /// Publishes the commit timestamp.
    ///
    /// The release store makes `ptr` and `next` visible to any thread that
    /// subsequently observes the new timestamp.
    #[inline]
    pub(crate) fn set_ts(&self, ts: Timestamp) {
        self.ts.store(ts.as_u64(), Ordering::Release);
    }

    /// Payload handle, `None` for the tail sentinel.
    #[inline]
    pub fn ptr(&self) -> Option<&P> {
        self.ptr.as_ref()
    }

    /// Replaces the payload handle of an entry that has not been linked yet.
    #[inline]
    pub fn set_ptr(&mut self, ptr: P) {
        self.ptr = Some(ptr);
    }

    /// Next-older entry, null only for the tail.
    #[inline]
    pub fn next<'g>(&self, guard: &'g Guard) -> Shared<'g, BundleEntry<P>> {
        self.next.load(Ordering::Acquire, guard)
    }

    #[inline]
    pub(crate) fn set_next(&self, next: Shared<'_, BundleEntry<P>>) {
        self.next.store(next, Ordering::Release);
    }

    /// Returns true while the entry is linked but not yet finalized.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.ts().is_pending()
    }

    /// Returns true for the tail sentinel.
    #[inline]
    pub fn is_tail(&self, guard: &Guard) -> bool {
        self.next(guard).is_null()
    }

    /// Records the timestamp at which this entry was retired.
    ///
    /// Retirement is one-way: only the first call stores its timestamp and
    /// returns true. The read path never consults the marker.
    pub fn mark(&self, ts: Timestamp) -> bool {
        self.deleted_ts
            .compare_exchange(
                Timestamp::NULL.as_u64(),
                ts.as_u64(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Retirement timestamp, if the entry has been marked.
    pub fn marked(&self) -> Option<Timestamp> {
        let raw = Timestamp::from_raw(self.deleted_ts.load(Ordering::Acquire));
        (!raw.is_null()).then_some(raw)
    }

    /// Checks that this entry is not older than its successor.
    ///
    /// A violation means the chain ordering invariant was broken by a logic
    /// error. That is not recoverable, so this panics.
    pub fn validate(&self, guard: &Guard) {
        let next = self.next(guard);
        // SAFETY: `next` was loaded under `guard`; entries stay allocated until
        // every guard that could have observed them is dropped.
        if let Some(next) = unsafe { next.as_ref() } {
            let (ts, next_ts) = (self.ts(), next.ts());
            if ts < next_ts {
                fatal_corruption(format_args!(
                    "invalid bundle: entry {} precedes older entry {}",
                    ts, next_ts
                ));
            }
        }
    }
}

impl<P> std::fmt::Debug for BundleEntry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleEntry")
            .field("ts", &self.ts())
            .field("has_ptr", &self.ptr.is_some())
            .field("marked", &self.marked())
            .finish_non_exhaustive()
    }
}
