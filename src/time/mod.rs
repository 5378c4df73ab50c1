// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Commit timestamps and the oracles that mint them.
//!
//! Bundles order versions by a single global commit timestamp. This module
//! provides the [`Timestamp`] type, the [`TimestampOracle`] seam a host uses to
//! obtain commit and query timestamps, and two reference oracles:
//!
//! - **HLC**: hybrid logical clock, wall-clock nanoseconds bumped to stay
//!   strictly increasing
//! - **Logical**: a bare counter, deterministic for tests and benches
//!
//! # Example
//!
//! ```
//! use strontium_bundle::time::{HlcOracle, TimestampOracle};
//!
//! let oracle = HlcOracle::default();
//! let t1 = oracle.next_commit();
//! let t2 = oracle.next_commit();
//! assert!(t1 < t2);
//! assert!(oracle.read_timestamp() >= t2);
//! ```

mod hlc;
mod logical;
mod timestamp;
mod traits;

pub use hlc::HlcOracle;
pub use logical::LogicalOracle;
pub use timestamp::Timestamp;
pub use traits::TimestampOracle;
