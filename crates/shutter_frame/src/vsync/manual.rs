//! Test-driven vsync: nothing fires until [`ManualVsyncSource::tick`] is called.

use parking_lot::{Condvar, Mutex};
use shutter_core::TimePoint;
use std::time::{Duration, Instant};

use super::{VsyncFire, VsyncSource};

#[derive(Default)]
struct ManualState {
    pending: Option<VsyncFire>,
    requests: u64,
}

/// A vsync source that holds each request until the test or harness ticks it.
#[derive(Default)]
pub struct ManualVsyncSource {
    state: Mutex<ManualState>,
    requested: Condvar,
}

impl ManualVsyncSource {
    /// Creates a source with no pending request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the pending request with the given times.
    ///
    /// Returns false if nothing was waiting for a vsync.
    pub fn tick(&self, frame_start_time: TimePoint, frame_target_time: TimePoint) -> bool {
        let fire = self.state.lock().pending.take();
        match fire {
            Some(fire) => {
                fire.fire(frame_start_time, frame_target_time);
                true
            }
            None => false,
        }
    }

    /// Fires the pending request starting now and targeting `interval` later.
    pub fn tick_now(&self, interval: Duration) -> bool {
        let start = TimePoint::now();
        self.tick(start, start + interval)
    }

    /// Returns true while a request is waiting for a tick.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Total number of requests received.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.state.lock().requests
    }

    /// Blocks until a request is pending or `timeout` elapses.
    ///
    /// Returns true if a request is pending.
    pub fn wait_for_request(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.pending.is_none() {
            if self.requested.wait_until(&mut state, deadline).timed_out() {
                return state.pending.is_some();
            }
        }
        true
    }
}

impl VsyncSource for ManualVsyncSource {
    fn request_vsync(&self, fire: VsyncFire) {
        let mut state = self.state.lock();
        if state.pending.is_some() {
            tracing::warn!("manual vsync already has a pending request, replacing it");
        }
        state.pending = Some(fire);
        state.requests += 1;
        drop(state);
        self.requested.notify_all();
    }
}

impl std::fmt::Debug for ManualVsyncSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualVsyncSource")
            .field("pending", &state.pending.is_some())
            .field("requests", &state.requests)
            .finish()
    }
}
