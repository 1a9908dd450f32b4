//! # Synchronization Primitives
//!
//! Two small building blocks the animator leans on:
//!
//! ```text
//! RequestFrame ──> CountingGate (1 permit) ──> at most one vsync wait in flight
//!
//! BeginFrame ──> Generation::bump() ──> stale idle callbacks become no-ops
//! ```
//!
//! Neither primitive ever blocks indefinitely.

mod gate;
mod generation;

pub use gate::CountingGate;
pub use generation::{Epoch, Generation};
