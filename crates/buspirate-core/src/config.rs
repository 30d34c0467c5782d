//! Adapter configuration
//!
//! Serial settings are fixed by the firmware (115200 8N1), so only the
//! device path, the exchange timeouts and the queue size are configurable.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::BusPirateError;
use crate::protocol::{DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_MS, RESET_TIMEOUT_MS};

/// Read timeouts used by the exchange layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for normal exchanges (ms)
    pub short_ms: u64,
    /// Timeout for the hardware-reset exchange (ms)
    pub reset_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            short_ms: DEFAULT_TIMEOUT_MS,
            reset_ms: RESET_TIMEOUT_MS,
        }
    }
}

impl TimeoutConfig {
    /// Normal exchange timeout
    pub fn short(&self) -> Duration {
        Duration::from_millis(self.short_ms)
    }

    /// Hardware-reset exchange timeout
    pub fn reset(&self) -> Duration {
        Duration::from_millis(self.reset_ms)
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusPirateConfig {
    /// Device path; empty selects the platform default
    pub device: String,
    /// Exchange read timeouts
    pub timeouts: TimeoutConfig,
    /// Capacity of the reader's byte queue
    pub queue_capacity: usize,
}

impl Default for BusPirateConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            timeouts: TimeoutConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl BusPirateConfig {
    /// Config for `device` with default timeouts
    pub fn with_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json_str(s: &str) -> Result<Self, BusPirateError> {
        serde_json::from_str(s).map_err(|e| BusPirateError::Config(e.to_string()))
    }

    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self, BusPirateError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BusPirateError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, BusPirateError> {
        serde_json::to_string_pretty(self).map_err(|e| BusPirateError::Config(e.to_string()))
    }
}
