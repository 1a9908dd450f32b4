//! # Shell
//!
//! One engine instance: threads, animator, rasterizer, and the glue between
//! them.
//!
//! ```text
//!   Shell
//!   ├── ThreadHost ── platform / ui / raster / io
//!   ├── Animator ──────────── delegate ──> ShellCore
//!   │                                        ├── FrameBuilder  (UI runner)
//!   └── Rasterizer <── draw posted ──────────┘
//!         └── FrameSink                    (raster runner)
//! ```

use parking_lot::Mutex;
use shutter_core::{Pipeline, TimePoint};
use shutter_frame::{Animator, AnimatorDelegate, AnimatorStats, FramePayload, FrameSize, VsyncSource};
use shutter_runtime::{run_sync, TaskRunner, TaskRunners, ThreadHost};
use std::sync::{Arc, OnceLock, Weak};

use crate::error::ShellResult;
use crate::rasterizer::{FrameSink, Rasterizer, RasterizerStats};
use crate::settings::Settings;

/// Produces frame payloads on the UI runner.
pub trait FrameBuilder<T>: Send {
    /// Builds the frame for `target_time` at `size`.
    ///
    /// Returning `None` skips the frame; the reserved pipeline slot is kept
    /// for the next vsync.
    fn build_frame(&mut self, target_time: TimePoint, size: FrameSize) -> Option<T>;

    /// No frame work is expected before `deadline`.
    fn notify_idle(&mut self, deadline: TimePoint) {
        let _ = deadline;
    }
}

/// The animator's delegate: builds on the UI runner, draws on the raster runner.
struct ShellCore<T: FramePayload> {
    animator: OnceLock<Weak<Animator<T>>>,
    rasterizer: Arc<Rasterizer<T>>,
    raster: TaskRunner,
    builder: Mutex<Box<dyn FrameBuilder<T>>>,
    viewport: Mutex<FrameSize>,
}

impl<T: FramePayload> ShellCore<T> {
    fn post_to_raster(&self, task: impl FnOnce() + Send + 'static) {
        if let Err(err) = self.raster.try_post_task(task) {
            tracing::debug!(error = %err, "raster runner gone, draw dropped");
        }
    }
}

impl<T: FramePayload> AnimatorDelegate<T> for ShellCore<T> {
    fn on_animator_begin_frame(&self, frame_target_time: TimePoint) {
        let Some(animator) = self.animator.get().and_then(Weak::upgrade) else {
            return;
        };

        let size = *self.viewport.lock();
        let frame = self.builder.lock().build_frame(frame_target_time, size);
        match frame {
            Some(frame) => animator.render(frame),
            None => tracing::trace!(%frame_target_time, "builder skipped frame"),
        }
    }

    fn on_animator_notify_idle(&self, deadline: TimePoint) {
        self.builder.lock().notify_idle(deadline);
    }

    fn on_animator_draw(&self, pipeline: Arc<Pipeline<T>>) {
        let rasterizer = Arc::clone(&self.rasterizer);
        self.post_to_raster(move || rasterizer.draw(&pipeline));
    }

    fn on_animator_draw_last_layer_tree(&self) {
        let rasterizer = Arc::clone(&self.rasterizer);
        self.post_to_raster(move || rasterizer.draw_last_layer_tree());
    }
}

/// A running engine instance.
///
/// Dropping the shell stops the animator on the UI runner, then terminates
/// and joins every thread.
pub struct Shell<T: FramePayload> {
    animator: Arc<Animator<T>>,
    core: Arc<ShellCore<T>>,
    task_runners: TaskRunners,
    // Declared last: joined after everything above is gone.
    host: ThreadHost,
}

impl<T: FramePayload> Shell<T> {
    /// Spawns the threads and wires the animator to `builder` and `sink`.
    ///
    /// `vsync` is called once with the new runners and returns the vsync
    /// source for this shell.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Config`] for invalid frame settings and
    /// [`crate::ShellError::Runtime`] if a thread cannot be spawned.
    pub fn create<V, B, S>(settings: Settings, vsync: V, builder: B, sink: S) -> ShellResult<Self>
    where
        V: FnOnce(&TaskRunners) -> Arc<dyn VsyncSource>,
        B: FrameBuilder<T> + 'static,
        S: FrameSink<T> + 'static,
    {
        settings.frame.validate()?;

        let host = ThreadHost::new(&settings.label, settings.threads, settings.shutdown_policy)?;
        let task_runners = host.task_runners().clone();

        let rasterizer = Rasterizer::new(task_runners.raster().clone(), Box::new(sink));
        let core = Arc::new(ShellCore {
            animator: OnceLock::new(),
            rasterizer,
            raster: task_runners.raster().clone(),
            builder: Mutex::new(Box::new(builder)),
            viewport: Mutex::new(FrameSize::default()),
        });

        let vsync = vsync(&task_runners);
        let delegate: Arc<dyn AnimatorDelegate<T>> = core.clone();
        let animator = Animator::new(delegate, task_runners.clone(), vsync, settings.frame);
        let _ = core.animator.set(Arc::downgrade(&animator));

        tracing::info!(label = %settings.label, "shell created");

        Ok(Self {
            animator,
            core,
            task_runners,
            host,
        })
    }

    /// Requests a frame. Safe to call from any thread.
    pub fn request_frame(&self, regenerate_layer_tree: bool) {
        self.animator.request_frame(regenerate_layer_tree);
    }

    /// Changes the viewport. A different size forces a new frame, even while
    /// stopped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Runtime`] if the UI runner has shut down.
    pub fn set_viewport_size(&self, size: FrameSize) -> ShellResult<()> {
        let core = Arc::clone(&self.core);
        let animator = Arc::downgrade(&self.animator);
        self.task_runners.ui().try_post_task(move || {
            let Some(animator) = animator.upgrade() else {
                return;
            };
            let changed = {
                let mut viewport = core.viewport.lock();
                std::mem::replace(&mut *viewport, size) != size
            };
            if changed {
                tracing::debug!(%size, "viewport resized");
                animator.set_dimension_change_pending(size);
                animator.request_frame(true);
            }
        })?;
        Ok(())
    }

    /// Resumes frame production.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Runtime`] if the UI runner has shut down.
    pub fn start(&self) -> ShellResult<()> {
        let animator = Arc::clone(&self.animator);
        run_sync(self.task_runners.ui(), move || animator.start())?;
        Ok(())
    }

    /// Stops frame production. Resizes still produce frames.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Runtime`] if the UI runner has shut down.
    pub fn stop(&self) -> ShellResult<()> {
        let animator = Arc::clone(&self.animator);
        run_sync(self.task_runners.ui(), move || animator.stop())?;
        Ok(())
    }

    /// Current viewport size.
    #[must_use]
    pub fn viewport_size(&self) -> FrameSize {
        *self.core.viewport.lock()
    }

    /// Animator counters.
    #[must_use]
    pub fn animator_stats(&self) -> AnimatorStats {
        self.animator.stats()
    }

    /// Rasterizer counters.
    #[must_use]
    pub fn rasterizer_stats(&self) -> RasterizerStats {
        self.core.rasterizer.stats()
    }

    /// The runners of this shell.
    #[inline]
    #[must_use]
    pub fn task_runners(&self) -> &TaskRunners {
        &self.task_runners
    }

    /// The animator of this shell.
    #[inline]
    #[must_use]
    pub fn animator(&self) -> &Arc<Animator<T>> {
        &self.animator
    }
}

impl<T: FramePayload> Drop for Shell<T> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::debug!(error = %err, "animator already gone at shell drop");
        }
        tracing::info!(
            label = %self.task_runners.label(),
            threads = self.host.task_runners().unique_runner_count(),
            "shell shutting down"
        );
    }
}

impl<T: FramePayload> std::fmt::Debug for Shell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("task_runners", &self.task_runners)
            .field("animator", &self.animator)
            .finish_non_exhaustive()
    }
}
