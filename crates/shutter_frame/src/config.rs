//! # Frame Configuration
//!
//! Tunables for the animator and the fallback vsync source, loaded once at
//! startup. Every field is optional in TOML; missing fields take the defaults
//! below.
//!
//! ```toml
//! pipeline_depth = 2
//! idle_notify_wait_ms = 51
//! gate_acquire_timeout_ms = 50
//! idle_deadline_ms = 100
//! refresh_rate_hz = 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Default number of frames in flight.
pub const DEFAULT_PIPELINE_DEPTH: usize = 2;

/// Default debounce before the idle hint. Slightly over three frames at 60 Hz,
/// so a short burst of frames does not count as idle.
pub const DEFAULT_IDLE_NOTIFY_WAIT_MS: u64 = 51;

/// Default bounded wait for a cross-thread frame request.
pub const DEFAULT_GATE_ACQUIRE_TIMEOUT_MS: u64 = 50;

/// Default length of the idle window announced to the delegate.
pub const DEFAULT_IDLE_DEADLINE_MS: u64 = 100;

/// Default refresh rate of the fallback vsync source.
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 60;

const MAX_REFRESH_RATE_HZ: u32 = 1000;

/// Longest a cross-thread `request_frame` may block on the gate.
pub const MAX_GATE_ACQUIRE_TIMEOUT_MS: u64 = 1_000;

/// Longest accepted idle hint debounce.
pub const MAX_IDLE_NOTIFY_WAIT_MS: u64 = 10_000;

/// Animator and vsync tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Maximum frames reserved or queued in the pipeline.
    pub pipeline_depth: usize,
    /// Delay before the idle hint is delivered, in milliseconds.
    pub idle_notify_wait_ms: u64,
    /// Bounded wait for the request gate from off the UI thread, in milliseconds.
    /// Zero means a single non-blocking attempt.
    pub gate_acquire_timeout_ms: u64,
    /// Idle window announced to the delegate, in milliseconds.
    pub idle_deadline_ms: u64,
    /// Fallback vsync refresh rate.
    pub refresh_rate_hz: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            pipeline_depth: DEFAULT_PIPELINE_DEPTH,
            idle_notify_wait_ms: DEFAULT_IDLE_NOTIFY_WAIT_MS,
            gate_acquire_timeout_ms: DEFAULT_GATE_ACQUIRE_TIMEOUT_MS,
            idle_deadline_ms: DEFAULT_IDLE_DEADLINE_MS,
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
        }
    }
}

impl FrameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, or a validation
    /// error (see [`Self::validate`]).
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every field is in range.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pipeline_depth == 0 {
            return Err(ConfigError::InvalidDepth(self.pipeline_depth));
        }
        if self.refresh_rate_hz == 0 || self.refresh_rate_hz > MAX_REFRESH_RATE_HZ {
            return Err(ConfigError::InvalidRefreshRate(self.refresh_rate_hz));
        }
        check_duration(
            "idle_notify_wait_ms",
            self.idle_notify_wait_ms,
            1,
            MAX_IDLE_NOTIFY_WAIT_MS,
        )?;
        check_duration(
            "gate_acquire_timeout_ms",
            self.gate_acquire_timeout_ms,
            0,
            MAX_GATE_ACQUIRE_TIMEOUT_MS,
        )?;
        check_duration("idle_deadline_ms", self.idle_deadline_ms, 1, u64::MAX)?;
        Ok(())
    }

    /// Idle hint debounce.
    #[inline]
    #[must_use]
    pub const fn idle_notify_wait(&self) -> Duration {
        Duration::from_millis(self.idle_notify_wait_ms)
    }

    /// Cross-thread gate wait.
    #[inline]
    #[must_use]
    pub const fn gate_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_acquire_timeout_ms)
    }

    /// Idle window length.
    #[inline]
    #[must_use]
    pub const fn idle_deadline(&self) -> Duration {
        Duration::from_millis(self.idle_deadline_ms)
    }

    /// Interval between fallback vsync ticks.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(1) / self.refresh_rate_hz.max(1)
    }
}

fn check_duration(
    field: &'static str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> ConfigResult<()> {
    if (min_ms..=max_ms).contains(&value_ms) {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration {
            field,
            value_ms,
            min_ms,
            max_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = FrameConfig::from_toml_str("").unwrap();
        assert_eq!(config, FrameConfig::default());
        assert_eq!(config.idle_notify_wait(), Duration::from_millis(51));
        assert_eq!(config.gate_acquire_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_override() {
        let config = FrameConfig::from_toml_str("pipeline_depth = 3\nrefresh_rate_hz = 120").unwrap();
        assert_eq!(config.pipeline_depth, 3);
        assert_eq!(config.refresh_rate_hz, 120);
        assert_eq!(config.idle_deadline_ms, DEFAULT_IDLE_DEADLINE_MS);
        assert_eq!(config.refresh_interval(), Duration::from_nanos(8_333_333));
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let text = toml::to_string(&FrameConfig::default()).unwrap();
        assert_eq!(FrameConfig::from_toml_str(&text).unwrap(), FrameConfig::default());
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = FrameConfig::from_toml_str("pipeline_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDepth(0)));
    }

    #[test]
    fn test_rejects_bad_refresh_rate() {
        let err = FrameConfig::from_toml_str("refresh_rate_hz = 5000").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRefreshRate(5000)));
    }

    #[test]
    fn test_rejects_zero_idle_wait() {
        let err = FrameConfig::from_toml_str("idle_notify_wait_ms = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                field: "idle_notify_wait_ms",
                value_ms: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unbounded_gate_timeout() {
        let err = FrameConfig::from_toml_str("gate_acquire_timeout_ms = 3600000").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                field: "gate_acquire_timeout_ms",
                max_ms: MAX_GATE_ACQUIRE_TIMEOUT_MS,
                ..
            }
        ));
        assert!(FrameConfig::from_toml_str("gate_acquire_timeout_ms = 1000").is_ok());
        assert!(FrameConfig::from_toml_str("gate_acquire_timeout_ms = 0").is_ok());
    }

    #[test]
    fn test_rejects_overlong_idle_wait() {
        let err = FrameConfig::from_toml_str("idle_notify_wait_ms = 10001").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                field: "idle_notify_wait_ms",
                value_ms: 10_001,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = FrameConfig::from_toml_str("pipeline_depth = \"two\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FrameConfig::load("/nonexistent/shutter/frame.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
