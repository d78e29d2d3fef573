//! Playback port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::application::arbiter::ArbiterError;

/// Playback errors
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("Playback device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Media source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Failed to decode media: {0}")]
    Decode(String),

    #[error("Playback command failed: {0}")]
    CommandFailed(String),

    #[error(transparent)]
    AudioSession(#[from] ArbiterError),
}

/// Point-in-time reading from an open playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    pub is_playing: bool,
    pub position_millis: u64,
    /// `None` until the decoder knows the total length
    pub duration_millis: Option<u64>,
    /// The device reached the end of the media
    pub finished: bool,
}

/// Port for opening playable media
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Open `uri` for playback. The returned handle is paused.
    async fn open(&self, uri: &str) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

/// An open playback
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    async fn play(&self) -> Result<(), PlaybackError>;

    async fn pause(&self) -> Result<(), PlaybackError>;

    async fn seek(&self, position_millis: u64) -> Result<(), PlaybackError>;

    fn status(&self) -> DeviceStatus;

    /// Release the device; the handle is unusable afterwards
    async fn close(&self);
}
