//! Runtime configuration
//!
//! Stored as a postcard blob so it can live in flash, a file or a build
//! artifact. Every field has a default matching the nominal dashboard setup.

extern crate alloc;
use alloc::vec::Vec;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::bucket::BUCKET_WIDTH_SECS;
use crate::history::MAX_POINTS;

/// Default per-frame orientation interpolation factor
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.005;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to decode configuration: {0}")]
    Decode(postcard::Error),
    #[error("Failed to encode configuration: {0}")]
    Encode(postcard::Error),
    #[error("Invalid configuration value for `{field}`: {details}")]
    Invalid {
        field: &'static str,
        details: &'static str,
    },
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct TelemetryConfig<'a> {
    pub source: SourceConfig<'a>,
    pub engine: EngineConfig,
    pub polling: PollingConfig,
    pub orientation: OrientationConfig,
}

/// Where the external sample source lives. Only adapters read this.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct SourceConfig<'a> {
    pub base_url: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub bucket_width_secs: u32,
    pub max_points: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bucket_width_secs: BUCKET_WIDTH_SECS,
            max_points: MAX_POINTS as u32,
        }
    }
}

impl EngineConfig {
    pub fn capacity(&self) -> usize {
        self.max_points as usize
    }
}

/// Cadence of the external triggers driving each stream
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PollingConfig {
    pub telemetry_period_ms: u32,
    pub orientation_period_ms: u32,
    pub logs_period_ms: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            telemetry_period_ms: 5000,
            orientation_period_ms: 1000,
            logs_period_ms: 5000,
        }
    }
}

impl PollingConfig {
    pub fn telemetry_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.telemetry_period_ms))
    }

    pub fn orientation_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.orientation_period_ms))
    }

    pub fn logs_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.logs_period_ms))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct OrientationConfig {
    pub smoothing_factor: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }
}

impl<'a> TelemetryConfig<'a> {
    /// Decode and validate a configuration blob
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(ConfigError::Encode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.bucket_width_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.bucket_width_secs",
                details: "must be greater than zero",
            });
        }
        if self.engine.max_points == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.max_points",
                details: "must be greater than zero",
            });
        }

        let periods = [
            ("polling.telemetry_period_ms", self.polling.telemetry_period_ms),
            ("polling.orientation_period_ms", self.polling.orientation_period_ms),
            ("polling.logs_period_ms", self.polling.logs_period_ms),
        ];
        for (field, period) in periods {
            if period == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    details: "must be greater than zero",
                });
            }
        }

        let factor = self.orientation.smoothing_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "orientation.smoothing_factor",
                details: "must be in (0, 1]",
            });
        }
        Ok(())
    }
}
