// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Configuration for bundles.

/// Default number of busy-wait iterations before a waiter yields its time slice.
pub const DEFAULT_SPIN_BEFORE_YIELD: u32 = 128;

/// Tuning for the waits inside [`Bundle`](super::Bundle).
///
/// Writers wait while the head is pending before linking a new entry, and
/// readers wait for a pending head before walking the chain. Both waits spin
/// with [`std::hint::spin_loop`] for `spin_before_yield` iterations, then
/// alternate a yield with another round of spinning. There is no overall
/// deadline: a wait ends only when the writer that owns the pending entry
/// finalizes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleConfig {
    /// Busy-wait iterations per round before calling `thread::yield_now`.
    pub spin_before_yield: u32,
    /// Yield rounds after which a single `debug!` event reports a long wait.
    pub slow_wait_rounds: u32,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            spin_before_yield: DEFAULT_SPIN_BEFORE_YIELD,
            slow_wait_rounds: 1024,
        }
    }
}

impl BundleConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of spins per round. Zero yields on every iteration.
    pub fn with_spin_before_yield(mut self, spins: u32) -> Self {
        self.spin_before_yield = spins;
        self
    }

    /// Sets how many yield rounds pass before a slow wait is reported.
    pub fn with_slow_wait_rounds(mut self, rounds: u32) -> Self {
        self.slow_wait_rounds = rounds;
        self
    }
}
