//! # SHUTTER
//!
//! Frame production for a retained-mode UI engine: deciding when a frame is
//! built, handing it from the UI thread to the raster thread, and holding the
//! producer back when the raster thread falls behind.
//!
//! ## Crates
//!
//! - `shutter_core`: pipeline, counting gate, generation counter, time
//! - `shutter_runtime`: task runners and their threads
//! - `shutter_frame`: animator, vsync waiter, frame configuration
//! - `shutter` (this crate): the [`Shell`] that ties them together
//!
//! ## Example
//!
//! ```rust
//! use shutter::{FrameBuilder, FrameSink, Settings, Shell};
//! use shutter_core::TimePoint;
//! use shutter_frame::{FramePayload, FrameSize, ManualVsyncSource, VsyncSource};
//! use std::sync::Arc;
//!
//! struct Scene(FrameSize);
//!
//! impl FramePayload for Scene {
//!     fn frame_size(&self) -> FrameSize {
//!         self.0
//!     }
//! }
//!
//! struct Builder;
//!
//! impl FrameBuilder<Scene> for Builder {
//!     fn build_frame(&mut self, _target: TimePoint, size: FrameSize) -> Option<Scene> {
//!         Some(Scene(size))
//!     }
//! }
//!
//! struct NullSink;
//!
//! impl FrameSink<Scene> for NullSink {
//!     fn draw(&mut self, _frame: &Scene) -> bool {
//!         true
//!     }
//! }
//!
//! let vsync = Arc::new(ManualVsyncSource::new());
//! let source: Arc<dyn VsyncSource> = vsync.clone();
//! let shell = Shell::create(Settings::default(), move |_| source, Builder, NullSink)?;
//! shell.request_frame(true);
//! # Ok::<(), shutter::ShellError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod rasterizer;
pub mod settings;
pub mod shell;

pub use error::{ShellError, ShellResult};
pub use rasterizer::{FrameSink, Rasterizer, RasterizerStats};
pub use settings::Settings;
pub use shell::{FrameBuilder, Shell};

// Member crates, for users who depend on `shutter` alone.
pub use shutter_core as core;
pub use shutter_frame as frame;
pub use shutter_runtime as runtime;
