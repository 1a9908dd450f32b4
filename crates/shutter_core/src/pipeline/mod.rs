//! # Frame Pipeline
//!
//! Bounded hand-off of frame payloads from the UI thread to the raster thread.
//!
//! ## Architecture
//!
//! ```text
//!   UI thread                          Raster thread
//!   ─────────                          ─────────────
//!   produce() ──> ProducerContinuation
//!                       │
//!                 complete(frame) ──> [ FIFO: frame, frame ] ──> consume(|frame| ...)
//!                                                                      │
//!                                                         slot freed ──┘
//! ```
//!
//! A slot is held from `produce()` until the consumer callback for its payload
//! returns. With depth N, the (N+1)-th `produce()` returns `None` until the
//! consumer catches up: the producer is told to retry, never to wait.

mod slots;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use slots::{SlotHandle, SlotTable};

/// Outcome of [`Pipeline::consume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeResult {
    /// The FIFO was empty; the callback was not invoked.
    NoneAvailable,
    /// One payload was consumed and the FIFO is now empty.
    Done,
    /// One payload was consumed and more are waiting.
    MoreAvailable,
}

/// Outcome of [`ProducerContinuation::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProduceResult {
    /// Trace id of the published payload.
    pub trace_id: u64,
    /// True if the FIFO was empty before this payload was published.
    pub is_first_item: bool,
}

struct PipelineInner<T> {
    slots: SlotTable<T>,
    /// Completed slots in completion order.
    queue: VecDeque<SlotHandle>,
}

/// A depth-bounded producer/consumer channel for frame payloads.
///
/// Shared between exactly one producer role and one consumer role. All
/// bookkeeping sits behind one short-lived lock; the consumer callback runs
/// outside it.
pub struct Pipeline<T> {
    depth: usize,
    inner: Mutex<PipelineInner<T>>,
    next_trace_id: AtomicU64,
}

impl<T> Pipeline<T> {
    /// Creates a pipeline holding at most `depth` frames in flight.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    #[must_use]
    pub fn new(depth: usize) -> Arc<Self> {
        Arc::new(Self {
            depth,
            inner: Mutex::new(PipelineInner {
                slots: SlotTable::new(depth),
                queue: VecDeque::with_capacity(depth),
            }),
            next_trace_id: AtomicU64::new(1),
        })
    }

    /// Returns the maximum number of frames in flight.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of slots currently reserved, queued or being consumed.
    #[must_use]
    pub fn reserved(&self) -> usize {
        self.inner.lock().slots.in_use()
    }

    /// Returns the number of completed payloads waiting for the consumer.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Reserves a slot.
    ///
    /// Returns `None` when all `depth` slots are held. Never blocks.
    #[must_use]
    pub fn produce(self: &Arc<Self>) -> Option<ProducerContinuation<T>> {
        let mut inner = self.inner.lock();
        self.reserve_locked(&mut inner)
    }

    /// Reserves a slot only if the pipeline is completely idle: nothing
    /// reserved, queued or being consumed.
    #[must_use]
    pub fn produce_if_empty(self: &Arc<Self>) -> Option<ProducerContinuation<T>> {
        let mut inner = self.inner.lock();
        if inner.slots.in_use() > 0 {
            return None;
        }
        self.reserve_locked(&mut inner)
    }

    /// Removes the oldest completed payload and hands it to `consumer`.
    ///
    /// The payload's slot is freed once `consumer` returns (or unwinds). An
    /// empty pipeline is a no-op.
    pub fn consume<F>(&self, consumer: F) -> ConsumeResult
    where
        F: FnOnce(T),
    {
        let (payload, trace_id, handle, more) = {
            let mut inner = self.inner.lock();
            let Some(handle) = inner.queue.pop_front() else {
                return ConsumeResult::NoneAvailable;
            };
            let (payload, trace_id) = inner.slots.take(handle);
            (payload, trace_id, handle, !inner.queue.is_empty())
        };

        tracing::trace!(trace_id, "pipeline consume");

        let release = SlotRelease {
            pipeline: self,
            handle,
        };
        consumer(payload);
        drop(release);

        if more {
            ConsumeResult::MoreAvailable
        } else {
            ConsumeResult::Done
        }
    }

    fn reserve_locked(
        self: &Arc<Self>,
        inner: &mut PipelineInner<T>,
    ) -> Option<ProducerContinuation<T>> {
        let next_trace_id = || self.next_trace_id.fetch_add(1, Ordering::Relaxed);
        let Some((handle, trace_id)) = inner.slots.reserve(next_trace_id) else {
            tracing::trace!(depth = self.depth, "pipeline full");
            return None;
        };

        Some(ProducerContinuation {
            pipeline: Arc::clone(self),
            handle,
            trace_id,
            completed: false,
        })
    }

    fn publish(&self, handle: SlotHandle, payload: T) -> bool {
        let mut inner = self.inner.lock();
        inner.slots.fill(handle, payload);
        let is_first_item = inner.queue.is_empty();
        inner.queue.push_back(handle);
        is_first_item
    }

    fn release(&self, handle: SlotHandle) {
        self.inner.lock().slots.release(handle);
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Pipeline")
            .field("depth", &self.depth)
            .field("reserved", &inner.slots.in_use())
            .field("queued", &inner.queue.len())
            .finish()
    }
}

/// Frees a consumed slot even if the consumer unwinds.
struct SlotRelease<'a, T> {
    pipeline: &'a Pipeline<T>,
    handle: SlotHandle,
}

impl<T> Drop for SlotRelease<'_, T> {
    fn drop(&mut self) {
        self.pipeline.release(self.handle);
    }
}

/// A reserved pipeline slot, to be filled exactly once.
///
/// Completing consumes the continuation, so it cannot be completed twice.
/// Dropping it without completing discards the reservation and frees the slot.
#[must_use = "dropping a continuation discards its pipeline slot"]
pub struct ProducerContinuation<T> {
    pipeline: Arc<Pipeline<T>>,
    handle: SlotHandle,
    trace_id: u64,
    completed: bool,
}

impl<T> ProducerContinuation<T> {
    /// Returns the trace id assigned at reservation.
    #[inline]
    #[must_use]
    pub const fn trace_id(&self) -> u64 {
        self.trace_id
    }

    /// Publishes `payload` at the back of the FIFO.
    ///
    /// The slot stays reserved until the consumer has taken the payload.
    pub fn complete(mut self, payload: T) -> ProduceResult {
        let is_first_item = self.pipeline.publish(self.handle, payload);
        self.completed = true;

        tracing::trace!(trace_id = self.trace_id, is_first_item, "pipeline produce");

        ProduceResult {
            trace_id: self.trace_id,
            is_first_item,
        }
    }
}

impl<T> Drop for ProducerContinuation<T> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::trace!(trace_id = self.trace_id, "pipeline continuation discarded");
            self.pipeline.release(self.handle);
        }
    }
}

impl<T> fmt::Debug for ProducerContinuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerContinuation")
            .field("trace_id", &self.trace_id)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_creation() {
        let pipeline = Pipeline::<u32>::new(2);
        assert_eq!(pipeline.depth(), 2);
        assert_eq!(pipeline.reserved(), 0);
        assert_eq!(pipeline.queued(), 0);
    }

    #[test]
    fn test_depth_two_third_produce_fails() {
        let pipeline = Pipeline::<u32>::new(2);

        let first = pipeline.produce().unwrap();
        let second = pipeline.produce().unwrap();
        assert!(pipeline.produce().is_none());

        first.complete(1);
        second.complete(2);
        // Completed-but-unconsumed payloads still hold their slots.
        assert!(pipeline.produce().is_none());

        assert_eq!(pipeline.consume(|_| {}), ConsumeResult::MoreAvailable);
        let third = pipeline.produce().unwrap();
        third.complete(3);
        assert_eq!(pipeline.reserved(), 2);
    }

    #[test]
    fn test_consume_is_fifo_in_completion_order() {
        let pipeline = Pipeline::<&str>::new(3);

        let a = pipeline.produce().unwrap();
        let b = pipeline.produce().unwrap();
        let c = pipeline.produce().unwrap();

        // Complete out of reservation order.
        c.complete("c");
        a.complete("a");
        b.complete("b");

        let mut order = Vec::new();
        while pipeline.consume(|frame| order.push(frame)) != ConsumeResult::NoneAvailable {}
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_consume_empty_is_noop() {
        let pipeline = Pipeline::<u32>::new(2);
        let mut called = false;
        assert_eq!(pipeline.consume(|_| called = true), ConsumeResult::NoneAvailable);
        assert!(!called);

        // A reserved-but-incomplete slot is not consumable either.
        let _pending = pipeline.produce().unwrap();
        assert_eq!(pipeline.consume(|_| called = true), ConsumeResult::NoneAvailable);
        assert!(!called);
    }

    #[test]
    fn test_dropped_continuation_frees_slot() {
        let pipeline = Pipeline::<u32>::new(1);
        {
            let _continuation = pipeline.produce().unwrap();
            assert!(pipeline.produce().is_none());
        }
        assert_eq!(pipeline.reserved(), 0);
        assert!(pipeline.produce().is_some());
    }

    #[test]
    fn test_slot_held_during_consume() {
        let pipeline = Pipeline::<u32>::new(1);
        pipeline.produce().unwrap().complete(9);

        let inner_pipeline = Arc::clone(&pipeline);
        pipeline.consume(move |frame| {
            assert_eq!(frame, 9);
            assert!(inner_pipeline.produce().is_none());
        });
        assert!(pipeline.produce().is_some());
    }

    #[test]
    fn test_produce_if_empty() {
        let pipeline = Pipeline::<u32>::new(2);
        let held = pipeline.produce_if_empty().unwrap();
        assert!(pipeline.produce_if_empty().is_none());

        held.complete(1);
        assert!(pipeline.produce_if_empty().is_none());

        pipeline.consume(|_| {});
        assert!(pipeline.produce_if_empty().is_some());
    }

    #[test]
    fn test_produce_result_reports_first_item() {
        let pipeline = Pipeline::<u32>::new(2);
        let a = pipeline.produce().unwrap();
        let b = pipeline.produce().unwrap();
        let a_id = a.trace_id();

        let first = a.complete(1);
        assert!(first.is_first_item);
        assert_eq!(first.trace_id, a_id);

        let second = b.complete(2);
        assert!(!second.is_first_item);
        assert!(second.trace_id > first.trace_id);
    }

    #[test]
    fn test_panicking_consumer_frees_slot() {
        let pipeline = Pipeline::<u32>::new(1);
        pipeline.produce().unwrap().complete(1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pipeline.consume(|_| panic!("raster fault"));
        }));
        assert!(result.is_err());
        assert_eq!(pipeline.reserved(), 0);
    }

    #[test]
    fn test_trace_ids_are_contiguous_under_backpressure() {
        let pipeline = Pipeline::<u32>::new(1);
        let first = pipeline.produce().unwrap();
        for _ in 0..5 {
            assert!(pipeline.produce().is_none());
        }
        let first_id = first.trace_id();
        drop(first);

        let second = pipeline.produce().unwrap();
        assert_eq!(second.trace_id(), first_id + 1);
    }

    #[test]
    #[should_panic(expected = "Pipeline depth must be greater than zero")]
    fn test_zero_depth_panics() {
        let _ = Pipeline::<u32>::new(0);
    }
}
