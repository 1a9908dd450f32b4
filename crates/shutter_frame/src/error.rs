//! # Frame Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a [`crate::FrameConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML text could not be parsed.
    #[error("invalid frame configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read {path}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Pipeline depth must hold at least one frame.
    #[error("pipeline depth must be at least 1, got {0}")]
    InvalidDepth(usize),

    /// Refresh rate outside the supported range.
    #[error("refresh rate must be between 1 and 1000 Hz, got {0}")]
    InvalidRefreshRate(u32),

    /// A timing value outside `min_ms..=max_ms`.
    #[error("{field} must be between {min_ms} and {max_ms} ms, got {value_ms}")]
    InvalidDuration {
        /// Name of the offending setting.
        field: &'static str,
        /// Configured value.
        value_ms: u64,
        /// Smallest accepted value.
        min_ms: u64,
        /// Largest accepted value.
        max_ms: u64,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
