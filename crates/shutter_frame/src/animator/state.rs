//! Mutable animator state and its diagnostics views.

use shutter_core::{ProducerContinuation, TimePoint};

use crate::payload::FrameSize;

/// Coarse animator state, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimatorPhase {
    /// No frame requested.
    Idle,
    /// A frame was requested and the vsync callback has not fired yet.
    AwaitingVsync,
    /// The begin-frame hook is running.
    Building,
    /// Stopped; requests are ignored unless a resize is pending.
    Paused,
}

/// Counters describing what the animator has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimatorStats {
    /// Begin-frame hooks dispatched.
    pub frames_begun: u64,
    /// Payloads completed into the pipeline.
    pub frames_rendered: u64,
    /// Vsyncs answered by redrawing the previous frame.
    pub frames_reused: u64,
    /// Vsyncs that found the pipeline full and retried on the next one.
    pub pipeline_full_retries: u64,
    /// Requests folded into one that was already pending.
    pub requests_coalesced: u64,
    /// Idle hints delivered to the delegate.
    pub idle_notifications: u64,
}

pub(crate) struct AnimatorState<T> {
    pub(crate) paused: bool,
    /// Size a resize is waiting for. Cleared once a frame of that size renders.
    pub(crate) pending_dimension: Option<FrameSize>,
    pub(crate) frame_scheduled: bool,
    pub(crate) regenerate_layer_tree: bool,
    pub(crate) building: bool,
    pub(crate) last_frame_size: Option<FrameSize>,
    /// Reserved slot carried over when a begin-frame produced nothing.
    pub(crate) producer_continuation: Option<ProducerContinuation<T>>,
    pub(crate) last_begin_frame_time: TimePoint,
    pub(crate) last_frame_target_time: TimePoint,
    pub(crate) frame_deadline: TimePoint,
    pub(crate) frame_number: u64,
    pub(crate) stats: AnimatorStats,
}

impl<T> AnimatorState<T> {
    pub(crate) fn new() -> Self {
        Self {
            paused: false,
            pending_dimension: None,
            frame_scheduled: false,
            regenerate_layer_tree: false,
            building: false,
            last_frame_size: None,
            producer_continuation: None,
            last_begin_frame_time: TimePoint::ZERO,
            last_frame_target_time: TimePoint::ZERO,
            frame_deadline: TimePoint::ZERO,
            frame_number: 0,
            stats: AnimatorStats::default(),
        }
    }

    #[inline]
    pub(crate) fn dimension_change_pending(&self) -> bool {
        self.pending_dimension.is_some()
    }

    /// A request is only honored while paused if a resize must go through.
    #[inline]
    pub(crate) fn blocked_by_pause(&self) -> bool {
        self.paused && !self.dimension_change_pending()
    }

    /// The previous frame can be redrawn as-is.
    #[inline]
    pub(crate) fn can_reuse_last_layer_tree(&self) -> bool {
        !self.regenerate_layer_tree && !self.dimension_change_pending()
    }

    pub(crate) fn phase(&self) -> AnimatorPhase {
        if self.building {
            AnimatorPhase::Building
        } else if self.frame_scheduled {
            AnimatorPhase::AwaitingVsync
        } else if self.paused {
            AnimatorPhase::Paused
        } else {
            AnimatorPhase::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_yields_to_pending_resize() {
        let mut state = AnimatorState::<()>::new();
        assert!(!state.blocked_by_pause());
        state.paused = true;
        assert!(state.blocked_by_pause());
        state.pending_dimension = Some(FrameSize::new(800, 600));
        assert!(!state.blocked_by_pause());
    }

    #[test]
    fn test_reuse_requires_no_regeneration_and_no_resize() {
        let mut state = AnimatorState::<()>::new();
        assert!(state.can_reuse_last_layer_tree());
        state.regenerate_layer_tree = true;
        assert!(!state.can_reuse_last_layer_tree());
        state.regenerate_layer_tree = false;
        state.pending_dimension = Some(FrameSize::new(800, 600));
        assert!(!state.can_reuse_last_layer_tree());
    }

    #[test]
    fn test_phase_precedence() {
        let mut state = AnimatorState::<()>::new();
        assert_eq!(state.phase(), AnimatorPhase::Idle);
        state.paused = true;
        assert_eq!(state.phase(), AnimatorPhase::Paused);
        state.frame_scheduled = true;
        assert_eq!(state.phase(), AnimatorPhase::AwaitingVsync);
        state.building = true;
        assert_eq!(state.phase(), AnimatorPhase::Building);
    }
}
