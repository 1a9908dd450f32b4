//! # Frame Payloads
//!
//! What the animator needs to know about a built frame.

use std::fmt;

/// Logical frame dimensions in physical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Creates a frame size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A fully built, immutable frame handed from the UI thread to the raster thread.
///
/// The payload moves through the pipeline by value; it is never cloned on the
/// way.
pub trait FramePayload: Send + 'static {
    /// Size the frame was laid out for.
    fn frame_size(&self) -> FrameSize;
}
