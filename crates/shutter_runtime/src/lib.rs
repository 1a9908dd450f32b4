//! # SHUTTER Runtime
//!
//! Sequential task runners, one OS thread each.
//!
//! ## Guarantees
//!
//! - Tasks posted to one runner never overlap and run in eligibility order;
//!   equal eligibility times run in post order.
//! - Different runners run fully in parallel.
//! - A panicking task is caught, counted and logged with `tracing::error!`;
//!   the runner moves on to the next task.
//! - There is no cancellation. A delayed task that may become stale captures
//!   a [`shutter_core::Epoch`] and checks it when it runs.
//!
//! ## Example
//!
//! ```rust
//! use shutter_runtime::{run_sync, ShutdownPolicy, ThreadHost, ThreadRoles};
//!
//! let host = ThreadHost::new("demo", ThreadRoles::ALL, ShutdownPolicy::Discard)?;
//! let runners = host.task_runners().clone();
//!
//! let ui = runners.ui().clone();
//! let on_ui = run_sync(runners.raster(), move || ui.runs_tasks_on_current_thread())?;
//! assert!(!on_ui);
//! # Ok::<(), shutter_runtime::RuntimeError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod message_loop;
pub mod task;
pub mod task_runner;
pub mod task_runners;
pub mod thread;

pub use error::{RuntimeError, RuntimeResult};
pub use message_loop::ShutdownPolicy;
pub use task::Task;
pub use task_runner::{run_now_or_post_task, run_sync, TaskRunner};
pub use task_runners::{TaskRunners, ThreadHost, ThreadRoles};
pub use thread::RunnerThread;
