//! # Runner Threads
//!
//! Each runner thread owns one OS thread running one message loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{RuntimeError, RuntimeResult};
use crate::message_loop::{MessageLoop, ShutdownPolicy};
use crate::task_runner::TaskRunner;

/// A named OS thread draining a message loop.
///
/// Dropping the thread (or calling [`Self::join`]) terminates the loop,
/// applies its [`ShutdownPolicy`] and joins the OS thread.
pub struct RunnerThread {
    runner: TaskRunner,
    join: Option<JoinHandle<()>>,
}

impl RunnerThread {
    /// Spawns a thread named `label`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Spawn`] if the OS refuses to create the thread.
    pub fn spawn(label: impl Into<String>, policy: ShutdownPolicy) -> RuntimeResult<Self> {
        let label = label.into();
        let message_loop = Arc::new(MessageLoop::new(label.clone(), policy));

        let loop_for_thread = Arc::clone(&message_loop);
        let join = thread::Builder::new()
            .name(label.clone())
            .spawn(move || loop_for_thread.run())
            .map_err(|source| RuntimeError::Spawn { label, source })?;

        Ok(Self {
            runner: TaskRunner::new(message_loop),
            join: Some(join),
        })
    }

    /// Returns the runner posting to this thread.
    #[inline]
    #[must_use]
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Terminates the loop and waits for the thread to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.runner.message_loop().terminate();

        let Some(join) = self.join.take() else {
            return;
        };
        if join.thread().id() == thread::current().id() {
            // Dropped from one of its own tasks: the loop exits after this
            // task returns, nothing left to wait for.
            return;
        }
        if join.join().is_err() {
            tracing::error!(runner = %self.runner.label(), "runner thread panicked during shutdown");
        }
    }
}

impl Drop for RunnerThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RunnerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerThread")
            .field("runner", &self.runner)
            .field("running", &self.join.is_some())
            .finish()
    }
}
