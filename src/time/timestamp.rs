// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Commit timestamp with reserved sentinel values.

/// A point commit timestamp.
///
/// Commit timestamps are totally ordered by their numeric value. Two values are
/// reserved: [`Timestamp::NULL`] sorts below every commit and stands for "before
/// any recorded update", [`Timestamp::PENDING`] sorts above every commit and
/// marks a bundle entry whose commit timestamp has not been published yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp of the tail sentinel.
    pub const NULL: Timestamp = Timestamp(0);

    /// Placeholder for an entry that is linked but not yet finalized.
    pub const PENDING: Timestamp = Timestamp(u64::MAX);

    /// Smallest real commit timestamp.
    pub const MIN: Timestamp = Timestamp(1);

    /// Largest real commit timestamp.
    pub const MAX: Timestamp = Timestamp(u64::MAX - 1);

    /// Creates a commit timestamp from a raw value.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `value` collides with a sentinel.
    #[inline]
    pub fn new(value: u64) -> Self {
        debug_assert!(
            value != Self::NULL.0 && value != Self::PENDING.0,
            "commit timestamp {value} collides with a sentinel"
        );
        Self(value)
    }

    /// Wraps a raw value without checking for sentinels.
    ///
    /// Used when loading a value back out of an atomic slot.
    #[inline]
    pub(crate) const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true for the `NULL` sentinel.
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == Self::NULL.0
    }

    /// Returns true for the `PENDING` sentinel.
    #[inline]
    pub const fn is_pending(&self) -> bool {
        self.0 == Self::PENDING.0
    }

    /// Returns true if this is a real commit timestamp rather than a sentinel.
    #[inline]
    pub const fn is_commit(&self) -> bool {
        !self.is_null() && !self.is_pending()
    }

    /// Returns the next commit timestamp, saturating at [`Timestamp::MAX`].
    #[inline]
    pub fn successor(&self) -> Self {
        Self(self.0.saturating_add(1).clamp(Self::MIN.0, Self::MAX.0))
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::NULL => write!(f, "null"),
            Self::PENDING => write!(f, "pending"),
            Self(value) => write!(f, "{}", value),
        }
    }
}
