//! # Runtime Error Types

use thiserror::Error;

/// Errors reported by task runners and their threads.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The runner's loop has shut down and no longer accepts tasks.
    #[error("task runner '{label}' has been terminated")]
    Terminated {
        /// Label of the runner.
        label: String,
    },

    /// The OS refused to spawn a runner thread.
    #[error("failed to spawn thread '{label}'")]
    Spawn {
        /// Name of the thread.
        label: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A synchronously awaited task panicked or was discarded before running.
    #[error("task on runner '{label}' never completed")]
    Abandoned {
        /// Label of the runner.
        label: String,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
