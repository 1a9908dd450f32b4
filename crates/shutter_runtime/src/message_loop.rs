//! # Message Loop
//!
//! The queue behind one task runner, drained by exactly one thread.
//!
//! ```text
//!   post_task ──┐
//!   post_task ──┼──> [ heap ordered by (target, insertion) ] ──> loop thread
//!   post_delayed┘         parking_lot Mutex + Condvar            runs one task
//!                                                                 at a time
//! ```
//!
//! The loop sleeps on the condition variable until either a new task is
//! posted or the earliest delayed task becomes eligible.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use shutter_core::TimePoint;
use std::any::Any;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

use crate::error::{RuntimeError, RuntimeResult};
use crate::task::{PendingTask, Task};

/// What happens to queued tasks when a loop shuts down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Drop every pending task without running it.
    #[default]
    Discard,
    /// Run the tasks that are already eligible, drop future delayed tasks.
    RunReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Running,
    /// Termination requested; posts are still accepted but will not run
    /// unless the shutdown policy drains them.
    Terminating,
    /// Posts are rejected.
    Terminated,
}

struct LoopQueue {
    heap: BinaryHeap<PendingTask>,
    next_order: u64,
    state: LoopState,
}

pub(crate) struct MessageLoop {
    label: String,
    policy: ShutdownPolicy,
    queue: Mutex<LoopQueue>,
    wake: Condvar,
    thread_id: OnceLock<ThreadId>,
    faults: AtomicU64,
}

impl MessageLoop {
    pub(crate) fn new(label: String, policy: ShutdownPolicy) -> Self {
        Self {
            label,
            policy,
            queue: Mutex::new(LoopQueue {
                heap: BinaryHeap::new(),
                next_order: 0,
                state: LoopState::Running,
            }),
            wake: Condvar::new(),
            thread_id: OnceLock::new(),
            faults: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn post(&self, task: Task, target: TimePoint) -> RuntimeResult<()> {
        let mut queue = self.queue.lock();
        if queue.state == LoopState::Terminated {
            return Err(RuntimeError::Terminated {
                label: self.label.clone(),
            });
        }

        let order = queue.next_order;
        queue.next_order += 1;
        queue.heap.push(PendingTask {
            target,
            order,
            task,
        });
        drop(queue);

        self.wake.notify_one();
        Ok(())
    }

    pub(crate) fn runs_on_current_thread(&self) -> bool {
        self.thread_id.get() == Some(&thread::current().id())
    }

    pub(crate) fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.queue.lock().heap.len()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.queue.lock().state == LoopState::Terminated
    }

    /// Asks the loop to stop after the task it is currently running.
    pub(crate) fn terminate(&self) {
        let mut queue = self.queue.lock();
        if queue.state == LoopState::Running {
            queue.state = LoopState::Terminating;
        }
        drop(queue);
        self.wake.notify_all();
    }

    /// Loop thread entry point. Returns once [`Self::terminate`] was called
    /// and the shutdown policy has been applied.
    pub(crate) fn run(&self) {
        let _ = self.thread_id.set(thread::current().id());
        tracing::debug!(runner = %self.label, "message loop started");

        while let Some(task) = self.next_task() {
            self.run_task(task);
        }

        self.shutdown();
    }

    fn next_task(&self) -> Option<Task> {
        let mut queue = self.queue.lock();
        loop {
            if queue.state != LoopState::Running {
                return None;
            }

            match queue.heap.peek().map(|pending| pending.target) {
                None => self.wake.wait(&mut queue),
                Some(target) if target <= TimePoint::now() => {
                    return queue.heap.pop().map(|pending| pending.task);
                }
                Some(target) => {
                    let _ = self.wake.wait_until(&mut queue, target.to_instant());
                }
            }
        }
    }

    fn run_task(&self, task: Task) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            self.faults.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                runner = %self.label,
                reason = panic_message(payload.as_ref()),
                "task panicked, runner continues"
            );
        }
    }

    fn shutdown(&self) {
        let mut pending = {
            let mut queue = self.queue.lock();
            queue.state = LoopState::Terminated;
            std::mem::take(&mut queue.heap)
        };

        if self.policy == ShutdownPolicy::RunReady {
            let now = TimePoint::now();
            while pending.peek().is_some_and(|next| next.target <= now) {
                if let Some(next) = pending.pop() {
                    self.run_task(next.task);
                }
            }
        }

        tracing::debug!(
            runner = %self.label,
            discarded = pending.len(),
            "message loop terminated"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
