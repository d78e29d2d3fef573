//! Engine configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::duration::Duration;
use crate::domain::error::ConfigError;
use crate::domain::recording::RecordingPreset;

/// Keys accepted by `get`/`set`
pub const CONFIG_KEYS: &[&str] = &[
    "preset",
    "metering_interval",
    "existence_retry",
    "status_interval",
    "cache_max_age",
    "data_dir",
];

/// Engine configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recording encoder preset ("high" or "low")
    pub preset: Option<String>,
    /// How often the recorder samples the input level
    pub metering_interval: Option<String>,
    /// Delay before re-probing a recording that is not yet on disk
    pub existence_retry: Option<String>,
    /// How often the player polls playback status
    pub status_interval: Option<String>,
    /// Age after which a cache entry is treated as absent
    pub cache_max_age: Option<String>,
    /// Where recordings and the cache index live
    pub data_dir: Option<String>,
}

impl EngineConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            preset: Some(RecordingPreset::default().to_string()),
            metering_interval: Some(Duration::default_metering_interval().to_string()),
            existence_retry: Some(Duration::default_existence_retry().to_string()),
            status_interval: Some(Duration::default_status_interval().to_string()),
            cache_max_age: Some(Duration::default_cache_max_age().to_string()),
            data_dir: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            preset: other.preset.or(self.preset),
            metering_interval: other.metering_interval.or(self.metering_interval),
            existence_retry: other.existence_retry.or(self.existence_retry),
            status_interval: other.status_interval.or(self.status_interval),
            cache_max_age: other.cache_max_age.or(self.cache_max_age),
            data_dir: other.data_dir.or(self.data_dir),
        }
    }

    pub fn preset_or_default(&self) -> RecordingPreset {
        self.preset
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn metering_interval_or_default(&self) -> Duration {
        parse_or(&self.metering_interval, Duration::default_metering_interval())
    }

    pub fn existence_retry_or_default(&self) -> Duration {
        parse_or(&self.existence_retry, Duration::default_existence_retry())
    }

    pub fn status_interval_or_default(&self) -> Duration {
        parse_or(&self.status_interval, Duration::default_status_interval())
    }

    pub fn cache_max_age_or_default(&self) -> Duration {
        parse_or(&self.cache_max_age, Duration::default_cache_max_age())
    }

    /// Read a value by key
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "preset" => &self.preset,
            "metering_interval" => &self.metering_interval,
            "existence_retry" => &self.existence_retry,
            "status_interval" => &self.status_interval,
            "cache_max_age" => &self.cache_max_age,
            "data_dir" => &self.data_dir,
            _ => return Err(unknown_key(key)),
        };
        Ok(value.clone())
    }

    /// Check every populated field the way `set` would
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in CONFIG_KEYS {
            if let Some(value) = self.get(key)? {
                Self::empty().set(key, &value)?;
            }
        }
        Ok(())
    }

    /// Validate and store a value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::ValidationError {
            key: key.to_string(),
            message,
        };

        let slot = match key {
            "preset" => {
                value
                    .parse::<RecordingPreset>()
                    .map_err(|e| invalid(e.to_string()))?;
                &mut self.preset
            }
            "metering_interval" | "existence_retry" | "status_interval" | "cache_max_age" => {
                value
                    .parse::<Duration>()
                    .map_err(|e| invalid(e.to_string()))?;
                match key {
                    "metering_interval" => &mut self.metering_interval,
                    "existence_retry" => &mut self.existence_retry,
                    "status_interval" => &mut self.status_interval,
                    _ => &mut self.cache_max_age,
                }
            }
            "data_dir" => {
                if value.trim().is_empty() {
                    return Err(invalid("Path must not be empty".to_string()));
                }
                &mut self.data_dir
            }
            _ => return Err(unknown_key(key)),
        };
        *slot = Some(value.trim().to_string());
        Ok(())
    }
}

fn parse_or(value: &Option<String>, default: Duration) -> Duration {
    value
        .as_ref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn unknown_key(key: &str) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", CONFIG_KEYS.join(", ")),
    }
}
