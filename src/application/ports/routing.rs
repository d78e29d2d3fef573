//! Audio routing port interface

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Device routing mode. Record and playback routing are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMode {
    Record,
    Playback,
}

impl AudioMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Playback => "playback",
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing errors
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    #[error("No {0} device available")]
    NoDevice(AudioMode),

    #[error("Failed to configure {mode} routing: {message}")]
    ConfigureFailed { mode: AudioMode, message: String },
}

/// Port for switching the shared audio device between record and playback
#[async_trait]
pub trait AudioRouting: Send + Sync {
    /// Reconfigure the device for `mode`
    async fn set_mode(&self, mode: AudioMode) -> Result<(), RoutingError>;
}
