//! # Rasterizer
//!
//! Raster-thread consumer of the frame pipeline. Keeps the last frame it drew
//! so an unchanged vsync can be answered without a rebuild.

use parking_lot::Mutex;
use shutter_core::{ConsumeResult, Pipeline};
use shutter_runtime::TaskRunner;
use std::sync::Arc;

/// Where finished frames end up: a GPU surface, a software canvas, a test log.
pub trait FrameSink<T>: Send {
    /// Rasterizes `frame`. Returns false if the frame could not be presented.
    fn draw(&mut self, frame: &T) -> bool;
}

/// Counters for the raster side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterizerStats {
    /// New frames taken from the pipeline and drawn.
    pub frames_drawn: u64,
    /// Previous frames drawn again.
    pub frames_redrawn: u64,
    /// Draws the sink reported as failed.
    pub frames_failed: u64,
    /// Redraw requests with no previous frame to draw.
    pub redraws_skipped: u64,
}

struct RasterizerInner<T> {
    sink: Box<dyn FrameSink<T>>,
    last_frame: Option<T>,
    stats: RasterizerStats,
}

/// Draws frames from the pipeline on the raster runner.
pub struct Rasterizer<T> {
    raster: TaskRunner,
    inner: Mutex<RasterizerInner<T>>,
}

impl<T: Send + 'static> Rasterizer<T> {
    /// Creates a rasterizer drawing into `sink` on `raster`.
    #[must_use]
    pub fn new(raster: TaskRunner, sink: Box<dyn FrameSink<T>>) -> Arc<Self> {
        Arc::new(Self {
            raster,
            inner: Mutex::new(RasterizerInner {
                sink,
                last_frame: None,
                stats: RasterizerStats::default(),
            }),
        })
    }

    /// Consumes the oldest queued frame and draws it. If more frames are
    /// waiting, another draw is posted to the raster runner.
    pub fn draw(self: &Arc<Self>, pipeline: &Arc<Pipeline<T>>) {
        debug_assert!(
            self.raster.runs_tasks_on_current_thread(),
            "Rasterizer::draw must run on the raster runner"
        );

        let result = pipeline.consume(|frame| self.draw_frame(frame));

        if result == ConsumeResult::MoreAvailable {
            let this = Arc::clone(self);
            let pipeline = Arc::clone(pipeline);
            if let Err(err) = self.raster.try_post_task(move || this.draw(&pipeline)) {
                tracing::debug!(error = %err, "raster runner gone, queued frames dropped");
            }
        }
    }

    /// Draws the previously drawn frame again.
    pub fn draw_last_layer_tree(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let Some(frame) = inner.last_frame.as_ref() else {
            inner.stats.redraws_skipped += 1;
            tracing::trace!("no previous frame to redraw");
            return;
        };

        if inner.sink.draw(frame) {
            inner.stats.frames_redrawn += 1;
        } else {
            inner.stats.frames_failed += 1;
            tracing::warn!("redraw of previous frame failed");
        }
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> RasterizerStats {
        self.inner.lock().stats
    }

    /// Returns true once a frame has been drawn.
    #[must_use]
    pub fn has_last_frame(&self) -> bool {
        self.inner.lock().last_frame.is_some()
    }

    fn draw_frame(&self, frame: T) {
        let mut inner = self.inner.lock();
        if inner.sink.draw(&frame) {
            inner.stats.frames_drawn += 1;
        } else {
            inner.stats.frames_failed += 1;
            tracing::warn!("frame draw failed");
        }
        inner.last_frame = Some(frame);
    }
}

impl<T> std::fmt::Debug for Rasterizer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("raster", &self.raster)
            .field("stats", &self.inner.lock().stats)
            .finish_non_exhaustive()
    }
}
