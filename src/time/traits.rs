// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! TimestampOracle trait definition.

use super::Timestamp;

/// Source of commit and query timestamps.
///
/// Bundles never mint timestamps themselves. Point-in-time reads across many
/// bundles are only linearizable if every writer in the process draws its
/// commit timestamps from the same oracle.
pub trait TimestampOracle: Send + Sync {
    /// Returns a commit timestamp strictly greater than every commit timestamp
    /// previously returned by this oracle, to any caller.
    ///
    /// This is the hot path - implementations must not allocate or block.
    fn next_commit(&self) -> Timestamp;

    /// Returns a timestamp for a range query.
    ///
    /// The result is at least as large as every commit timestamp handed out
    /// before the call, so a query at this timestamp observes every update
    /// whose `finalize` has already returned. It is also reserved: every
    /// commit timestamp handed out after the call is strictly greater, so
    /// repeating a query at this timestamp sees the same snapshot.
    ///
    /// May be [`Timestamp::NULL`] before the first commit.
    fn read_timestamp(&self) -> Timestamp;

    /// Returns a short name for diagnostics.
    fn name(&self) -> &'static str;
}
