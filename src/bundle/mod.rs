// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Lock-free per-node version bundles.
//!
//! A bundle records every value a host node's pointer field has held, indexed
//! by commit timestamp, so that a range query running at timestamp `t` can
//! follow the pointer as it was at `t` while writers keep mutating the
//! structure.
//!
//! # Key Concepts
//!
//! ## Publish protocol
//!
//! A writer calls [`Bundle::prepare`] to link a new entry at the head with a
//! `PENDING` timestamp, obtains a commit timestamp, then calls
//! [`Bundle::finalize`] to publish it. At most one entry per bundle is ever
//! pending: `prepare` waits for a pending head to be finalized before linking
//! over it, so every entry's successor is already ordered.
//!
//! ## Read path
//!
//! [`Bundle::get_ptr_by_timestamp`] waits out a pending head (its eventual
//! timestamp may or may not precede the query), then walks towards the tail
//! and returns the newest entry whose timestamp is not after the query.
//!
//! ## Reclamation
//!
//! Entries are protected by `crossbeam-epoch`. Readers pass a pinned
//! [`Guard`]; [`Bundle::gc`] unlinks versions nobody can query any more and
//! defers their destruction until every pinned reader has moved on.
//!
//! # Example
//!
//! ```
//! use crossbeam_epoch as epoch;
//! use strontium_bundle::bundle::Bundle;
//! use strontium_bundle::time::Timestamp;
//!
//! let bundle = Bundle::new();
//!
//! bundle.prepare("a");
//! bundle.finalize(Timestamp::new(10));
//! bundle.prepare("b");
//! bundle.finalize(Timestamp::new(20));
//!
//! let guard = &epoch::pin();
//! assert_eq!(bundle.get_ptr_by_timestamp(Timestamp::new(15), guard), Some(&"a"));
//! assert_eq!(bundle.get_ptr_by_timestamp(Timestamp::new(20), guard), Some(&"b"));
//! assert_eq!(bundle.get_ptr_by_timestamp(Timestamp::new(5), guard), None);
//! ```

mod config;
mod entry;
mod error;
mod linked;

pub use config::{BundleConfig, DEFAULT_SPIN_BEFORE_YIELD};
pub use entry::BundleEntry;
pub use error::BundleError;
pub use linked::Bundle;

use crossbeam_epoch::Guard;

use crate::time::Timestamp;

/// The versioning capability a host node composes around one pointer field.
///
/// Call `prepare` and `finalize` around every update of the field, and hand
/// `get_ptr_by_timestamp` to the range-query traversal.
pub trait VersionHistory<P>: Send + Sync {
    /// Links `ptr` as the newest, not yet visible, version.
    fn prepare(&self, ptr: P);

    /// Publishes the version linked by the caller's preceding `prepare`.
    fn finalize(&self, ts: Timestamp);

    /// Returns the version authoritative at `ts`, or `None` if the field had
    /// not been updated by then.
    fn get_ptr_by_timestamp<'g>(&'g self, ts: Timestamp, guard: &'g Guard) -> Option<&'g P>;
}

/// Statistics from garbage collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub versions_scanned: u64,
    pub versions_retired: u64,
}

/// Shape of a quiescent chain, as reported by [`Bundle::check_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStats {
    /// Entries between head and tail, excluding the tail.
    pub len: usize,
    /// True if the head is still pending.
    pub pending: bool,
    /// Newest finalized timestamp.
    pub newest: Option<Timestamp>,
    /// Oldest finalized timestamp still linked.
    pub oldest: Option<Timestamp>,
}

/// Reports a broken bundle invariant and halts.
///
/// Continuing after a corrupted chain would let readers observe versions out
/// of timestamp order, so corruption is never returned as an error.
#[cold]
#[track_caller]
pub(crate) fn fatal_corruption(message: std::fmt::Arguments<'_>) -> ! {
    tracing::error!(detail = %message, "bundle invariant violated");
    panic!("{}", message);
}
