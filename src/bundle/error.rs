// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Bundle chain validation errors.

use crate::time::Timestamp;

/// Structural defects found by [`Bundle::check_chain`](super::Bundle::check_chain).
///
/// Protocol operations never return these: a defect observed on the hot path is
/// fatal. They exist so diagnostics and tests can inspect a quiescent chain
/// without tearing the process down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    #[error("entry at position {position} is pending but is not the head")]
    PendingNotAtHead { position: usize },

    #[error("entry at position {position} holds the null timestamp")]
    NullTimestamp { position: usize },

    #[error("timestamps out of order at position {position}: {newer} followed by {older}")]
    OutOfOrder {
        position: usize,
        newer: Timestamp,
        older: Timestamp,
    },

    #[error("chain ends at position {position} without reaching the tail")]
    TailUnreachable { position: usize },

    #[error("tail sentinel is corrupt: {0}")]
    CorruptTail(String),
}
