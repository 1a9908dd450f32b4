//! # Animator
//!
//! Turns frame requests and vsync ticks into at most one frame build per
//! tick.
//!
//! ```text
//!             request_frame()                 vsync fires
//!   Idle ─────────────────────> AwaitingVsync ───────────┬──> reuse last tree ──> Idle
//!    ▲        (gate acquired)                            │
//!    │                                                   └──> Building ── render() ──> Idle
//!    │                                                          │
//!    └──────────── pipeline full: request_frame() again ◄───────┘
//!
//!   stop() ──> Paused ── start() ──> request_frame()
//! ```
//!
//! ## Threading
//!
//! Everything except [`Animator::request_frame`] runs on the UI runner.
//! `request_frame` may be called from any thread: the request gate (one
//! permit) is the synchronization point, and the actual vsync wait is posted
//! to the UI runner.
//!
//! ## Idle hints
//!
//! After a begin-frame with no follow-up request, a delayed task captures the
//! current [`Epoch`]. Every begin-frame bumps the generation, so a hint whose
//! epoch is stale when it runs is dropped instead of cancelled.

mod state;

pub use state::{AnimatorPhase, AnimatorStats};

use parking_lot::Mutex;
use shutter_core::{CountingGate, Epoch, Generation, Pipeline, TimePoint};
use shutter_runtime::TaskRunners;
use std::sync::{Arc, Weak};

use crate::config::FrameConfig;
use crate::delegate::AnimatorDelegate;
use crate::payload::{FramePayload, FrameSize};
use crate::vsync::{VsyncSource, VsyncWaiter};
use state::AnimatorState;

/// Frame scheduling state machine for one engine instance.
pub struct Animator<T: FramePayload> {
    weak_self: Weak<Self>,
    delegate: Arc<dyn AnimatorDelegate<T>>,
    task_runners: TaskRunners,
    waiter: VsyncWaiter,
    pipeline: Arc<Pipeline<T>>,
    /// One permit: held from a successful request until its vsync fires.
    request_gate: CountingGate,
    idle_generation: Generation,
    config: FrameConfig,
    state: Mutex<AnimatorState<T>>,
}

impl<T: FramePayload> Animator<T> {
    /// Creates an animator delivering vsyncs from `vsync` on the UI runner.
    ///
    /// # Panics
    ///
    /// Panics if `config.pipeline_depth` is zero.
    #[must_use]
    pub fn new(
        delegate: Arc<dyn AnimatorDelegate<T>>,
        task_runners: TaskRunners,
        vsync: Arc<dyn VsyncSource>,
        config: FrameConfig,
    ) -> Arc<Self> {
        let waiter = VsyncWaiter::new(task_runners.ui().clone(), vsync);
        let pipeline = Pipeline::new(config.pipeline_depth);

        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            delegate,
            task_runners,
            waiter,
            pipeline,
            request_gate: CountingGate::new(1),
            idle_generation: Generation::new(),
            config,
            state: Mutex::new(AnimatorState::new()),
        })
    }

    /// Asks for a frame at the next vsync. Safe to call from any thread.
    ///
    /// With `regenerate_layer_tree` false and no resize pending, the vsync
    /// redraws the previous frame instead of building a new one. Repeated
    /// requests before the vsync fires are coalesced into one.
    pub fn request_frame(&self, regenerate_layer_tree: bool) {
        {
            let mut state = self.state.lock();
            if regenerate_layer_tree {
                state.regenerate_layer_tree = true;
            }
            if state.blocked_by_pause() {
                tracing::trace!("frame request ignored while paused");
                return;
            }
        }

        if !self.acquire_request_gate() {
            self.state.lock().stats.requests_coalesced += 1;
            tracing::trace!("frame request coalesced into pending request");
            return;
        }

        self.state.lock().frame_scheduled = true;

        let weak = self.weak_self.clone();
        let posted = self.task_runners.ui().try_post_task(move || {
            if let Some(animator) = weak.upgrade() {
                animator.await_vsync();
            }
        });
        if let Err(err) = posted {
            self.state.lock().frame_scheduled = false;
            self.request_gate.release();
            tracing::warn!(error = %err, "frame request dropped");
        }
    }

    /// Completes the held pipeline slot with `payload` and asks the delegate
    /// to draw it. Called by the delegate from its begin-frame hook.
    pub fn render(&self, payload: T) {
        self.debug_assert_on_ui("render");

        let size = payload.frame_size();
        let continuation = {
            let mut state = self.state.lock();
            if state.pending_dimension == Some(size) {
                state.pending_dimension = None;
            }
            state.last_frame_size = Some(size);
            state.building = false;
            state.producer_continuation.take()
        };

        let Some(continuation) = continuation else {
            tracing::warn!(%size, "render without a reserved pipeline slot, frame dropped");
            return;
        };

        let result = continuation.complete(payload);
        self.state.lock().stats.frames_rendered += 1;
        tracing::trace!(trace_id = result.trace_id, %size, "frame queued");

        self.delegate.on_animator_draw(Arc::clone(&self.pipeline));
    }

    /// Resumes frame production and requests a frame. No-op unless stopped.
    pub fn start(&self) {
        self.debug_assert_on_ui("start");

        let was_paused = std::mem::replace(&mut self.state.lock().paused, false);
        if was_paused {
            tracing::debug!("animator started");
            self.request_frame(true);
        }
    }

    /// Stops frame production until [`Self::start`]. Resizes still go through.
    pub fn stop(&self) {
        self.debug_assert_on_ui("stop");

        let mut state = self.state.lock();
        if !state.paused {
            state.paused = true;
            tracing::debug!("animator stopped");
        }
    }

    /// Forces frames to be built even while paused or when the last frame
    /// could otherwise be reused, until a frame of `size` is rendered.
    ///
    /// A newer resize replaces the target of an older one.
    pub fn set_dimension_change_pending(&self, size: FrameSize) {
        self.debug_assert_on_ui("set_dimension_change_pending");
        self.state.lock().pending_dimension = Some(size);
    }

    /// Returns the coarse current state.
    #[must_use]
    pub fn phase(&self) -> AnimatorPhase {
        self.state.lock().phase()
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> AnimatorStats {
        self.state.lock().stats
    }

    /// Number of frames begun so far.
    #[must_use]
    pub fn frame_number(&self) -> u64 {
        self.state.lock().frame_number
    }

    /// Vsync start time of the most recent begin-frame.
    #[must_use]
    pub fn last_begin_frame_time(&self) -> TimePoint {
        self.state.lock().last_begin_frame_time
    }

    /// Vsync target time of the most recent begin-frame.
    #[must_use]
    pub fn last_frame_target_time(&self) -> TimePoint {
        self.state.lock().last_frame_target_time
    }

    /// Time by which the current frame should be handed to the raster thread.
    #[must_use]
    pub fn frame_deadline(&self) -> TimePoint {
        self.state.lock().frame_deadline
    }

    /// Returns true while stopped.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Returns true while a resize is waiting for its frame.
    #[must_use]
    pub fn dimension_change_pending(&self) -> bool {
        self.state.lock().dimension_change_pending()
    }

    /// The size the pending resize is waiting for, if any.
    #[must_use]
    pub fn pending_dimension(&self) -> Option<FrameSize> {
        self.state.lock().pending_dimension
    }

    /// The pipeline frames are queued in.
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline<T>> {
        &self.pipeline
    }

    /// The runners this animator schedules on.
    #[inline]
    #[must_use]
    pub fn task_runners(&self) -> &TaskRunners {
        &self.task_runners
    }

    /// The tunables this animator was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    // Off the UI thread a held gate usually means the UI thread is about to
    // release it, so wait briefly. On the UI thread nothing can release it
    // while we wait.
    fn acquire_request_gate(&self) -> bool {
        if self.task_runners.ui().runs_tasks_on_current_thread() {
            self.request_gate.try_acquire()
        } else {
            self.request_gate
                .acquire_timeout(self.config.gate_acquire_timeout())
        }
    }

    fn await_vsync(&self) {
        let weak = self.weak_self.clone();
        self.waiter
            .async_wait_for_vsync(Box::new(move |frame_start_time, frame_target_time| {
                if let Some(animator) = weak.upgrade() {
                    animator.on_vsync(frame_start_time, frame_target_time);
                }
            }));
    }

    fn on_vsync(&self, frame_start_time: TimePoint, frame_target_time: TimePoint) {
        let reuse_last_tree = {
            let mut state = self.state.lock();
            // Cleared first so a request made from the begin-frame hook schedules
            // the next frame.
            state.frame_scheduled = false;

            if state.blocked_by_pause() {
                drop(state);
                self.request_gate.release();
                tracing::debug!("vsync arrived while paused, frame skipped");
                return;
            }
            state.can_reuse_last_layer_tree()
        };

        if reuse_last_tree {
            self.draw_last_layer_tree();
        } else {
            self.begin_frame(frame_start_time, frame_target_time);
        }
    }

    fn draw_last_layer_tree(&self) {
        self.request_gate.release();
        self.state.lock().stats.frames_reused += 1;
        tracing::trace!("reusing last layer tree");
        self.delegate.on_animator_draw_last_layer_tree();
    }

    fn begin_frame(&self, frame_start_time: TimePoint, frame_target_time: TimePoint) {
        self.request_gate.release();
        let epoch = self.idle_generation.bump();

        let frame_number = {
            let mut state = self.state.lock();
            state.regenerate_layer_tree = false;

            if state.producer_continuation.is_none() {
                state.producer_continuation = self.pipeline.produce();
            }
            if state.producer_continuation.is_none() {
                state.stats.pipeline_full_retries += 1;
                None
            } else {
                state.last_begin_frame_time = frame_start_time;
                state.last_frame_target_time = frame_target_time;
                state.frame_deadline = frame_target_time;
                state.frame_number += 1;
                state.building = true;
                state.stats.frames_begun += 1;
                Some(state.frame_number)
            }
        };

        let Some(frame_number) = frame_number else {
            // Never build without a slot. The retry waits a full vsync.
            tracing::debug!(depth = self.pipeline.depth(), "pipeline full, retrying next vsync");
            self.request_frame(true);
            return;
        };

        tracing::trace!(frame_number, %frame_target_time, "begin frame");
        self.delegate.on_animator_begin_frame(frame_target_time);

        let frame_scheduled = {
            let mut state = self.state.lock();
            state.building = false;
            state.frame_scheduled
        };
        if !frame_scheduled {
            self.schedule_idle_notification(epoch);
        }
    }

    fn schedule_idle_notification(&self, epoch: Epoch) {
        let weak = self.weak_self.clone();
        let posted = self.task_runners.ui().try_post_delayed_task(
            move || {
                if let Some(animator) = weak.upgrade() {
                    animator.notify_idle_if_current(epoch);
                }
            },
            self.config.idle_notify_wait(),
        );
        if let Err(err) = posted {
            tracing::debug!(error = %err, "idle notification not scheduled");
        }
    }

    fn notify_idle_if_current(&self, epoch: Epoch) {
        if !self.idle_generation.is_current(epoch) {
            tracing::trace!(epoch = epoch.value(), "stale idle notification dropped");
            return;
        }

        let deadline = TimePoint::now() + self.config.idle_deadline();
        self.state.lock().stats.idle_notifications += 1;
        self.delegate.on_animator_notify_idle(deadline);
    }

    fn debug_assert_on_ui(&self, operation: &str) {
        debug_assert!(
            self.task_runners.ui().runs_tasks_on_current_thread(),
            "Animator::{operation} must be called on the UI runner"
        );
    }
}

impl<T: FramePayload> std::fmt::Debug for Animator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Animator")
            .field("phase", &state.phase())
            .field("frame_number", &state.frame_number)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
