//! # Configuration Management Module
//!
//! Persistent monitor settings stored in platform-appropriate locations.
//! Handles loading, saving, validating and providing defaults.
//!
//! ## Sections
//! - `sensor`: sample buffer capacity, finger-presence threshold, sampling cadence
//! - `alerts`: operator thresholds plus alert list sizing
//! - `history`: vitals log capacity and low-memory batch eviction
//! - `schedule`: tick-loop cadences
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/pulse-monitor/config.toml
//! - Linux: ~/.config/pulse-monitor/config.toml
//! - Windows: %APPDATA%\pulse-monitor\config.toml
//!
//! Values are read once at startup and written only on an explicit save.
//! There is no hot reload.

use crate::alerts::{AlertLimits, AlertThresholds};
use crate::error::ConfigError;
use crate::history::HistoryLimits;
use crate::spo2::DEFAULT_FINGER_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub alerts: AlertConfig,
    pub history: HistoryConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub buffer_capacity: usize,
    pub finger_threshold: u32,
    pub sample_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            finger_threshold: DEFAULT_FINGER_THRESHOLD,
            sample_interval_ms: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub active_capacity: usize,
    pub history_capacity: usize,
    pub reminder_interval_ms: u64,
    pub history_shrink_batch: usize,
    pub history_shrink_floor: usize,
    pub thresholds: AlertThresholds,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let limits = AlertLimits::default();
        Self {
            active_capacity: limits.active_capacity,
            history_capacity: limits.history_capacity,
            reminder_interval_ms: limits.reminder_interval_ms,
            history_shrink_batch: limits.history_shrink_batch,
            history_shrink_floor: limits.history_shrink_floor,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl AlertConfig {
    pub fn limits(&self) -> AlertLimits {
        AlertLimits {
            active_capacity: self.active_capacity,
            history_capacity: self.history_capacity,
            reminder_interval_ms: self.reminder_interval_ms,
            history_shrink_batch: self.history_shrink_batch,
            history_shrink_floor: self.history_shrink_floor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub low_memory_batch: usize,
    pub low_memory_floor: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let limits = HistoryLimits::default();
        Self {
            capacity: limits.capacity,
            low_memory_batch: limits.low_memory_batch,
            low_memory_floor: limits.low_memory_floor,
        }
    }
}

impl HistoryConfig {
    pub fn limits(&self) -> HistoryLimits {
        HistoryLimits {
            capacity: self.capacity,
            low_memory_batch: self.low_memory_batch,
            low_memory_floor: self.low_memory_floor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub aggregate_interval_ms: u64,
    pub alert_check_interval_ms: u64,
    pub history_log_interval_ms: u64,
    pub memory_check_interval_ms: u64,
    pub status_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            aggregate_interval_ms: 100,
            alert_check_interval_ms: 1_000,
            history_log_interval_ms: 1_000,
            memory_check_interval_ms: 30_000,
            status_interval_ms: 5_000,
        }
    }
}

fn non_zero<T: PartialEq + Default>(value: T, field: &'static str) -> Result<(), ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulse-monitor")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load config from `path`, writing defaults there if the file is missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let config: Config = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(ConfigError::ParseFailed)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, writing defaults", path.display());
                let config = Self::default();
                config.save_to(path)?;
                config
            }
            Err(e) => return Err(ConfigError::ReadFailed(e)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::config_path())
    }

    /// Save config to `path`
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// Reject settings the core cannot be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero(self.sensor.buffer_capacity, "sensor.buffer_capacity")?;
        non_zero(self.sensor.sample_interval_ms, "sensor.sample_interval_ms")?;
        non_zero(self.alerts.active_capacity, "alerts.active_capacity")?;
        non_zero(self.alerts.history_capacity, "alerts.history_capacity")?;
        non_zero(self.history.capacity, "history.capacity")?;
        non_zero(self.schedule.aggregate_interval_ms, "schedule.aggregate_interval_ms")?;
        non_zero(self.schedule.alert_check_interval_ms, "schedule.alert_check_interval_ms")?;
        non_zero(self.schedule.history_log_interval_ms, "schedule.history_log_interval_ms")?;
        non_zero(self.schedule.memory_check_interval_ms, "schedule.memory_check_interval_ms")?;
        non_zero(self.schedule.status_interval_ms, "schedule.status_interval_ms")?;

        let thresholds = &self.alerts.thresholds;
        if !(thresholds.heart_rate_min < thresholds.heart_rate_max) {
            return Err(ConfigError::Invalid {
                field: "alerts.thresholds.heart_rate_min",
                reason: format!(
                    "{} must be below heart_rate_max {}",
                    thresholds.heart_rate_min, thresholds.heart_rate_max
                ),
            });
        }

        Ok(())
    }
}
