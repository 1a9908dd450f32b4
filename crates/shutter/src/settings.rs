//! # Shell Settings
//!
//! ```toml
//! label = "main"
//! shutdown_policy = "run_ready"
//!
//! [threads]
//! io = false
//!
//! [frame]
//! pipeline_depth = 3
//! ```

use serde::{Deserialize, Serialize};
use shutter_frame::{ConfigError, FrameConfig};
use shutter_runtime::{ShutdownPolicy, ThreadRoles};
use std::path::Path;

use crate::error::ShellResult;

/// Everything needed to create a [`crate::Shell`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix of every thread name.
    pub label: String,
    /// Roles that get their own thread.
    pub threads: ThreadRoles,
    /// What runners do with queued tasks at shutdown.
    pub shutdown_policy: ShutdownPolicy,
    /// Animator and vsync tunables.
    pub frame: FrameConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            label: "shutter".to_string(),
            threads: ThreadRoles::default(),
            shutdown_policy: ShutdownPolicy::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl Settings {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShellError::Config`] for malformed TOML or invalid
    /// frame settings.
    pub fn from_toml_str(text: &str) -> ShellResult<Self> {
        let settings: Self = toml::from_str(text).map_err(ConfigError::from)?;
        settings.frame.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// As [`Self::from_toml_str`], plus [`ConfigError::Io`] if the file
    /// cannot be read.
    pub fn load(path: impl AsRef<Path>) -> ShellResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellError;

    #[test]
    fn test_nested_sections() {
        let settings = Settings::from_toml_str(
            r#"
            label = "main"
            shutdown_policy = "run_ready"

            [threads]
            io = false

            [frame]
            pipeline_depth = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.label, "main");
        assert_eq!(settings.shutdown_policy, ShutdownPolicy::RunReady);
        assert!(settings.threads.ui);
        assert!(!settings.threads.io);
        assert_eq!(settings.frame.pipeline_depth, 3);
        assert_eq!(settings.frame.idle_notify_wait_ms, 51);
    }

    #[test]
    fn test_invalid_frame_section_is_rejected() {
        let err = Settings::from_toml_str("[frame]\npipeline_depth = 0").unwrap_err();
        assert!(matches!(err, ShellError::Config(ConfigError::InvalidDepth(0))));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = Settings::from_toml_str(r#"shutdown_policy = "later""#).unwrap_err();
        assert!(matches!(err, ShellError::Config(ConfigError::Parse(_))));
    }
}
