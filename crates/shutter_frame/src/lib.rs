//! # SHUTTER Frame
//!
//! Decides *when* a frame is built.
//!
//! The [`Animator`] receives frame requests from any thread, waits for the
//! next vsync through a [`VsyncWaiter`], reserves a pipeline slot and calls
//! its [`AnimatorDelegate`] to build the frame on the UI runner. The built
//! payload goes through [`Animator::render`] into the pipeline, and the
//! delegate is asked to draw it on the raster runner.
//!
//! ## Frame Cycle
//!
//! ```text
//!   request_frame ──> gate ──> UI: await vsync ──> vsync ──> UI: begin frame
//!                                                               │
//!                           delegate.on_animator_begin_frame ◄──┘
//!                                        │
//!                              Animator::render(payload)
//!                                        │
//!                             pipeline.complete ──> delegate.on_animator_draw
//! ```
//!
//! Vsync sources are pluggable: [`FallbackVsyncSource`] ticks on a timer,
//! [`ManualVsyncSource`] ticks when told to.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod animator;
pub mod config;
pub mod delegate;
pub mod error;
pub mod payload;
pub mod vsync;

pub use animator::{Animator, AnimatorPhase, AnimatorStats};
pub use config::FrameConfig;
pub use delegate::AnimatorDelegate;
pub use error::{ConfigError, ConfigResult};
pub use payload::{FramePayload, FrameSize};
pub use vsync::{
    FallbackVsyncSource, ManualVsyncSource, VsyncCallback, VsyncFire, VsyncSource, VsyncWaiter,
};
