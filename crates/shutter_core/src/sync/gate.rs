//! # Counting Gate
//!
//! A counting semaphore that never waits forever.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Bounds how many operations may be in flight at once.
///
/// The animator sizes its gate to one permit: the permit is taken when a
/// vsync wait is registered and handed back when that vsync fires, so any
/// number of frame requests in between collapse into a single wait.
///
/// # Example
///
/// ```rust
/// use shutter_core::CountingGate;
/// use std::time::Duration;
///
/// let gate = CountingGate::new(1);
/// assert!(gate.try_acquire());
/// assert!(!gate.acquire_timeout(Duration::from_millis(1)));
/// gate.release();
/// assert!(gate.try_acquire());
/// ```
#[derive(Debug)]
pub struct CountingGate {
    /// Permits currently available.
    permits: Mutex<usize>,
    /// Signalled whenever a permit is returned.
    released: Condvar,
    /// Maximum number of permits.
    capacity: usize,
}

impl CountingGate {
    /// Creates a gate with `capacity` permits, all available.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "CountingGate capacity must be greater than zero");

        Self {
            permits: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    /// Returns the total number of permits.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    /// Takes a permit if one is available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Takes a permit, waiting at most `timeout` for one to be released.
    ///
    /// Returns `false` when the wait timed out.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();

        while *permits == 0 {
            if self.released.wait_until(&mut permits, deadline).timed_out() {
                break;
            }
        }

        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns a permit.
    ///
    /// The count never exceeds [`Self::capacity`]; an unmatched release is
    /// logged and ignored.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        if *permits >= self.capacity {
            tracing::warn!(capacity = self.capacity, "counting gate released without a matching acquire");
            return;
        }
        *permits += 1;
        self.released.notify_one();
    }
}
