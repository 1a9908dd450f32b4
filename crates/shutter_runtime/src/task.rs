//! # Tasks
//!
//! A task is a boxed closure plus the time it becomes eligible to run.

use shutter_core::TimePoint;
use std::cmp::Ordering;

/// A unit of work posted to a task runner.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A task waiting in a loop's queue.
///
/// `BinaryHeap` is a max-heap, so the ordering is reversed to pop the earliest
/// target time first, and the insertion order breaks ties.
pub(crate) struct PendingTask {
    pub(crate) target: TimePoint,
    pub(crate) order: u64,
    pub(crate) task: Task,
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.order == other.order
    }
}

impl Eq for PendingTask {}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .target
            .cmp(&self.target)
            .then_with(|| other.order.cmp(&self.order))
    }
}
