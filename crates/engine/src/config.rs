use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time::MediaTime;

pub const DEFAULT_SNAP_TOLERANCE_MS: i64 = 100;

/// Tunables for scrubbing and snapping.
///
/// # Example
/// ```
/// use scrub_engine::SeekConfig;
///
/// let config: SeekConfig = serde_json::from_str(r#"{ "stall_timeout_ms": 750 }"#)
///     .expect("valid config");
/// assert_eq!(config.snap_tolerance_before_ms, 100);
/// assert!(config.stall_timeout().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    /// Tolerance used while dragging; zero means frame accurate.
    pub scrub_tolerance_ms: i64,
    pub snap_tolerance_before_ms: i64,
    pub snap_tolerance_after_ms: i64,
    /// An in-flight seek older than this is abandoned. Disabled when absent.
    pub stall_timeout_ms: Option<u64>,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            scrub_tolerance_ms: 0,
            snap_tolerance_before_ms: DEFAULT_SNAP_TOLERANCE_MS,
            snap_tolerance_after_ms: DEFAULT_SNAP_TOLERANCE_MS,
            stall_timeout_ms: None,
        }
    }
}

impl SeekConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| EngineError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("scrub_tolerance_ms", self.scrub_tolerance_ms),
            ("snap_tolerance_before_ms", self.snap_tolerance_before_ms),
            ("snap_tolerance_after_ms", self.snap_tolerance_after_ms),
        ] {
            if value < 0 {
                return Err(EngineError::InvalidConfig {
                    reason: format!("{name} must not be negative, got {value}"),
                });
            }
        }
        if self.stall_timeout_ms == Some(0) {
            return Err(EngineError::InvalidConfig {
                reason: "stall_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn scrub_tolerance(&self) -> MediaTime {
        MediaTime::from_millis(self.scrub_tolerance_ms)
    }

    /// `(before, after)` tolerances for the final snap.
    pub fn snap_tolerances(&self) -> (MediaTime, MediaTime) {
        (
            MediaTime::from_millis(self.snap_tolerance_before_ms),
            MediaTime::from_millis(self.snap_tolerance_after_ms),
        )
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }
}
