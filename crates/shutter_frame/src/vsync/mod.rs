//! # Vsync Waiter
//!
//! Turns a platform vsync source into one-shot callbacks on the UI runner.
//!
//! ```text
//!   Animator ── async_wait_for_vsync(cb) ──> VsyncWaiter ── request_vsync(fire) ──> VsyncSource
//!                                                 ▲                                     │
//!                                                 └────────── fire(start, target) ──────┘
//!                                        cb(start, target) posted to the UI runner
//! ```
//!
//! A source receives one [`VsyncFire`] per request and consumes it when the
//! next vsync happens, so a registration can fire at most once.

mod fallback;
mod manual;

pub use fallback::FallbackVsyncSource;
pub use manual::ManualVsyncSource;

use parking_lot::Mutex;
use shutter_core::TimePoint;
use shutter_runtime::TaskRunner;
use std::sync::{Arc, Weak};

/// Callback receiving `(frame_start_time, frame_target_time)`.
pub type VsyncCallback = Box<dyn FnOnce(TimePoint, TimePoint) + Send + 'static>;

/// A platform (or simulated) vertical sync signal.
pub trait VsyncSource: Send + Sync {
    /// Arrange for `fire` to be called at the next vsync.
    fn request_vsync(&self, fire: VsyncFire);
}

/// Single-use handle a [`VsyncSource`] calls when the requested vsync happens.
#[must_use = "a vsync request that is never fired stalls the animator"]
pub struct VsyncFire {
    waiter: Weak<WaiterInner>,
}

impl VsyncFire {
    /// Delivers the vsync. A fire whose waiter has been dropped is a no-op.
    pub fn fire(self, frame_start_time: TimePoint, frame_target_time: TimePoint) {
        if let Some(waiter) = self.waiter.upgrade() {
            waiter.fire(frame_start_time, frame_target_time);
        }
    }
}

impl std::fmt::Debug for VsyncFire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VsyncFire")
            .field("live", &(self.waiter.strong_count() > 0))
            .finish()
    }
}

struct WaiterInner {
    ui: TaskRunner,
    callback: Mutex<Option<VsyncCallback>>,
}

impl WaiterInner {
    fn fire(&self, frame_start_time: TimePoint, frame_target_time: TimePoint) {
        let Some(callback) = self.callback.lock().take() else {
            tracing::trace!("vsync fired with no callback registered");
            return;
        };

        if let Err(err) = self
            .ui
            .try_post_task(move || callback(frame_start_time, frame_target_time))
        {
            tracing::debug!(error = %err, "vsync dropped, UI runner is gone");
        }
    }
}

/// Registers one-shot vsync callbacks and delivers them on the UI runner.
pub struct VsyncWaiter {
    inner: Arc<WaiterInner>,
    source: Arc<dyn VsyncSource>,
}

impl VsyncWaiter {
    /// Creates a waiter delivering callbacks on `ui`.
    pub fn new(ui: TaskRunner, source: Arc<dyn VsyncSource>) -> Self {
        Self {
            inner: Arc::new(WaiterInner {
                ui,
                callback: Mutex::new(None),
            }),
            source,
        }
    }

    /// Registers `callback` for the next vsync.
    ///
    /// Only one callback may be outstanding; a second registration before the
    /// first fires is ignored with a warning.
    pub fn async_wait_for_vsync(&self, callback: VsyncCallback) {
        {
            let mut slot = self.inner.callback.lock();
            if slot.is_some() {
                tracing::warn!("vsync callback already registered, ignoring second registration");
                return;
            }
            *slot = Some(callback);
        }

        self.source.request_vsync(VsyncFire {
            waiter: Arc::downgrade(&self.inner),
        });
    }

    /// Returns true while a registered callback has not fired yet.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.inner.callback.lock().is_some()
    }
}

impl std::fmt::Debug for VsyncWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VsyncWaiter")
            .field("ui", &self.inner.ui)
            .field("waiting", &self.is_waiting())
            .finish_non_exhaustive()
    }
}
