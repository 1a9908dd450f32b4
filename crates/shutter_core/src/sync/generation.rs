//! # Generation Counter
//!
//! Task runners have no cancellation. Work that must be invalidated by newer
//! activity captures an [`Epoch`] when it is scheduled and compares it with
//! the live value when it runs.

use std::sync::atomic::{AtomicU64, Ordering};

/// A captured generation value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// A monotonically increasing counter.
///
/// ```rust
/// use shutter_core::Generation;
///
/// let generation = Generation::new();
/// let scheduled = generation.current();
/// assert!(generation.is_current(scheduled));
///
/// generation.bump();
/// assert!(!generation.is_current(scheduled));
/// ```
#[derive(Debug, Default)]
pub struct Generation {
    value: AtomicU64,
}

impl Generation {
    /// Creates a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Captures the live value.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Epoch {
        Epoch(self.value.load(Ordering::Acquire))
    }

    /// Advances the counter, invalidating every previously captured epoch.
    ///
    /// Returns the new epoch.
    pub fn bump(&self) -> Epoch {
        Epoch(self.value.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Returns true if nothing has bumped the counter since `epoch` was captured.
    #[inline]
    #[must_use]
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }
}
