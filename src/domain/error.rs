//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected <number><unit> with units ms, s, m, h, d (e.g., 100ms, 30s, 2m30s, 7d)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when an unknown media type is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid media type: \"{input}\". Valid types are: image, voice")]
pub struct InvalidMediaTypeError {
    pub input: String,
}

/// Error when an unknown recording preset is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid recording preset: \"{input}\". Valid presets are: high, low")]
pub struct InvalidPresetError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
