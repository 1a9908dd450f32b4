//! # Animator Delegate
//!
//! The engine-side hooks the animator drives. All four are invoked on the UI
//! runner.

use shutter_core::{Pipeline, TimePoint};
use std::sync::Arc;

/// Hooks invoked by the [`crate::Animator`].
///
/// The delegate only ever sees successful hook invocations: a full pipeline,
/// a held gate or a pause is resolved inside the animator.
pub trait AnimatorDelegate<T>: Send + Sync {
    /// Build a frame for `frame_target_time`, then call
    /// [`crate::Animator::render`] with it. Called synchronously from the
    /// vsync callback with a pipeline slot already reserved.
    fn on_animator_begin_frame(&self, frame_target_time: TimePoint);

    /// Advisory: no frame work is expected before `deadline`.
    fn on_animator_notify_idle(&self, deadline: TimePoint);

    /// A payload was queued; consume it from `pipeline` on the raster runner.
    fn on_animator_draw(&self, pipeline: Arc<Pipeline<T>>);

    /// Nothing changed; re-rasterize the previous frame.
    fn on_animator_draw_last_layer_tree(&self);
}
