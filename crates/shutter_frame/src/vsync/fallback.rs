//! Timer-driven vsync for hosts without a display signal.

use shutter_core::TimePoint;
use shutter_runtime::TaskRunner;
use std::time::Duration;

use super::{VsyncFire, VsyncSource};

/// Fires on a fixed grid of ticks, phase-aligned to the source's creation.
///
/// Each request is answered at the next tick at or after the request time
/// with `target = start + interval`, delivered by a timed task on `runner`.
#[derive(Debug)]
pub struct FallbackVsyncSource {
    runner: TaskRunner,
    phase: TimePoint,
    interval: Duration,
}

impl FallbackVsyncSource {
    /// Creates a source ticking every `interval`, timed on `runner`.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is shorter than one microsecond.
    #[must_use]
    pub fn new(runner: TaskRunner, interval: Duration) -> Self {
        assert!(
            interval >= Duration::from_micros(1),
            "vsync interval must be at least one microsecond"
        );
        // Ticks are exchanged as microsecond time points.
        let interval = Duration::from_micros(u64::try_from(interval.as_micros()).unwrap_or(u64::MAX));
        Self {
            runner,
            phase: TimePoint::now(),
            interval,
        }
    }

    /// Creates a source ticking at `hz`.
    ///
    /// # Panics
    ///
    /// Panics if `hz` is zero or above one million.
    #[must_use]
    pub fn with_refresh_rate(runner: TaskRunner, hz: u32) -> Self {
        assert!(hz > 0, "refresh rate must be greater than zero");
        Self::new(runner, Duration::from_secs(1) / hz)
    }

    /// Returns the tick interval.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

/// Returns the first tick of the grid `phase + k * interval` at or after `now`.
pub(crate) fn snap_to_next_tick(now: TimePoint, phase: TimePoint, interval: Duration) -> TimePoint {
    let interval = i128::try_from(interval.as_micros()).unwrap_or(i128::MAX).max(1);
    let offset = (i128::from(phase.as_micros()) - i128::from(now.as_micros())).rem_euclid(interval);
    // `offset` is in [0, interval) and interval fits in u64 micros for any sane refresh rate.
    now + Duration::from_micros(u64::try_from(offset).unwrap_or(u64::MAX))
}

impl VsyncSource for FallbackVsyncSource {
    fn request_vsync(&self, fire: VsyncFire) {
        let start = snap_to_next_tick(TimePoint::now(), self.phase, self.interval);
        let target = start + self.interval;

        if let Err(err) = self
            .runner
            .try_post_task_for_time(move || fire.fire(start, target), start)
        {
            tracing::debug!(error = %err, "fallback vsync runner is gone");
        }
    }
}
