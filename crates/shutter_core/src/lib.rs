//! # SHUTTER Core
//!
//! The hand-off primitives every other SHUTTER crate is built on:
//!
//! - [`Pipeline`]: a depth-bounded producer/consumer channel. The UI thread
//!   reserves a slot with [`Pipeline::produce`], fills it through the returned
//!   [`ProducerContinuation`], and the raster thread drains it with
//!   [`Pipeline::consume`]. When every slot is reserved, `produce` returns
//!   `None` instead of blocking. That is the backpressure mechanism.
//! - [`CountingGate`]: a counting semaphore with a bounded-wait acquire, used
//!   to coalesce frame requests.
//! - [`Generation`]: a monotonic counter whose captured [`Epoch`] tells a
//!   delayed task whether it has been superseded.
//! - [`TimePoint`]: monotonic microsecond timestamps.
//!
//! ## Example
//!
//! ```rust
//! use shutter_core::{ConsumeResult, Pipeline};
//!
//! let pipeline = Pipeline::<u32>::new(2);
//!
//! let first = pipeline.produce().expect("slot available");
//! let second = pipeline.produce().expect("slot available");
//! assert!(pipeline.produce().is_none(), "depth 2 holds two frames");
//!
//! first.complete(1);
//! second.complete(2);
//!
//! let mut seen = Vec::new();
//! assert_eq!(pipeline.consume(|frame| seen.push(frame)), ConsumeResult::MoreAvailable);
//! assert_eq!(pipeline.consume(|frame| seen.push(frame)), ConsumeResult::Done);
//! assert_eq!(seen, vec![1, 2]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod pipeline;
pub mod sync;
pub mod time;

pub use pipeline::{ConsumeResult, Pipeline, ProduceResult, ProducerContinuation};
pub use sync::{CountingGate, Epoch, Generation};
pub use time::TimePoint;
