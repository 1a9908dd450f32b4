//! # Shell Error Types

use shutter_frame::ConfigError;
use shutter_runtime::RuntimeError;
use thiserror::Error;

/// Errors raised while creating or driving a [`crate::Shell`].
#[derive(Error, Debug)]
pub enum ShellError {
    /// Thread or runner failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Invalid or unreadable settings.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for shell operations.
pub type ShellResult<T> = Result<T, ShellError>;
