// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! strontium-bundle: lock-free per-node version bundles for linearizable range queries
//!
//! This crate provides the versioning primitive embedded in each node of a
//! concurrent index so that range queries can traverse the structure as of any
//! past commit timestamp without blocking writers.

pub mod bundle;
pub mod time;

pub use bundle::{
    Bundle, BundleConfig, BundleEntry, BundleError, ChainStats, GcStats, VersionHistory,
};
pub use time::{HlcOracle, LogicalOracle, Timestamp, TimestampOracle};
