//! # Task Runner
//!
//! A cloneable handle that posts work to one message loop.

use shutter_core::TimePoint;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{RuntimeError, RuntimeResult};
use crate::message_loop::MessageLoop;

/// Posts tasks to a single sequential execution context.
///
/// Tasks run in eligibility order; tasks with the same eligibility time run
/// in the order they were posted. Clones share the same loop, and two
/// runners compare equal when they share a loop.
///
/// # Example
///
/// ```rust
/// use shutter_runtime::{run_sync, RunnerThread, ShutdownPolicy};
///
/// let thread = RunnerThread::spawn("doc.ui", ShutdownPolicy::Discard)?;
/// let runner = thread.runner().clone();
///
/// let answer = run_sync(&runner, || 6 * 7)?;
/// assert_eq!(answer, 42);
/// # Ok::<(), shutter_runtime::RuntimeError>(())
/// ```
#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<MessageLoop>,
}

impl TaskRunner {
    pub(crate) fn new(inner: Arc<MessageLoop>) -> Self {
        Self { inner }
    }

    pub(crate) fn message_loop(&self) -> &MessageLoop {
        &self.inner
    }

    /// Returns the runner's label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.inner.label()
    }

    /// Runs `task` as soon as the tasks posted before it have finished.
    ///
    /// # Panics
    ///
    /// Panics if the runner has been terminated.
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task_for_time(task, TimePoint::now());
    }

    /// Runs `task` no earlier than `delay` from now.
    ///
    /// # Panics
    ///
    /// Panics if the runner has been terminated.
    pub fn post_delayed_task<F>(&self, task: F, delay: Duration)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task_for_time(task, TimePoint::now() + delay);
    }

    /// Runs `task` no earlier than `target`.
    ///
    /// # Panics
    ///
    /// Panics if the runner has been terminated.
    pub fn post_task_for_time<F>(&self, task: F, target: TimePoint)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(err) = self.try_post_task_for_time(task, target) {
            panic!("{err}");
        }
    }

    /// Like [`Self::post_task`], but reports a terminated runner instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Terminated`] once the runner has shut down.
    pub fn try_post_task<F>(&self, task: F) -> RuntimeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_post_task_for_time(task, TimePoint::now())
    }

    /// Like [`Self::post_delayed_task`], but reports a terminated runner.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Terminated`] once the runner has shut down.
    pub fn try_post_delayed_task<F>(&self, task: F, delay: Duration) -> RuntimeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_post_task_for_time(task, TimePoint::now() + delay)
    }

    /// Like [`Self::post_task_for_time`], but reports a terminated runner.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Terminated`] once the runner has shut down.
    pub fn try_post_task_for_time<F>(&self, task: F, target: TimePoint) -> RuntimeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.post(Box::new(task), target)
    }

    /// Returns true when called from the runner's own thread.
    #[must_use]
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        self.inner.runs_on_current_thread()
    }

    /// Number of tasks that panicked on this runner so far.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.inner.fault_count()
    }

    /// Number of tasks waiting in the queue.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.pending_count()
    }

    /// Returns true once the runner no longer accepts tasks.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl PartialEq for TaskRunner {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TaskRunner {}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("label", &self.label())
            .finish_non_exhaustive()
    }
}

/// Runs `task` inline when already on `runner`'s thread, otherwise posts it.
///
/// # Panics
///
/// Panics if the task has to be posted and the runner has been terminated.
pub fn run_now_or_post_task<F>(runner: &TaskRunner, task: F)
where
    F: FnOnce() + Send + 'static,
{
    if runner.runs_tasks_on_current_thread() {
        task();
    } else {
        runner.post_task(task);
    }
}

/// Runs `task` on `runner` and blocks until it has produced a result.
///
/// Called from the runner's own thread, the task runs inline.
///
/// # Errors
///
/// Returns [`RuntimeError::Terminated`] if the runner no longer accepts tasks,
/// or [`RuntimeError::Abandoned`] if the task panicked or was discarded at
/// shutdown before running.
pub fn run_sync<F, R>(runner: &TaskRunner, task: F) -> RuntimeResult<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if runner.runs_tasks_on_current_thread() {
        return Ok(task());
    }

    let (sender, receiver) = crossbeam_channel::bounded(1);
    runner.try_post_task(move || {
        let _ = sender.send(task());
    })?;

    receiver.recv().map_err(|_| RuntimeError::Abandoned {
        label: runner.label().to_string(),
    })
}
