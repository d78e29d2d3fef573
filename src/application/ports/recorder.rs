//! Recording port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::{InvalidStateTransition, RecordingPreset};

use crate::application::arbiter::ArbiterError;

/// Recording errors
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Recording device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Recorded media not found: {0}")]
    ResourceNotFound(String),

    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    #[error("Failed to encode recording: {0}")]
    EncodingFailed(String),

    #[error(transparent)]
    AudioSession(#[from] ArbiterError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),
}

/// Port for opening the capture device
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Prepare the device and begin capturing to a new media resource.
    ///
    /// # Returns
    /// A handle to the running capture, or `DeviceUnavailable`
    async fn begin(&self, preset: &RecordingPreset) -> Result<Box<dyn CaptureHandle>, RecordingError>;
}

/// A running capture
#[async_trait]
pub trait CaptureHandle: Send + Sync {
    /// Latest input level in dBFS, `None` when metering is unavailable
    fn level_db(&self) -> Option<f32>;

    async fn pause(&self) -> Result<(), RecordingError>;

    async fn resume(&self) -> Result<(), RecordingError>;

    /// Stop capturing and finalise the media.
    ///
    /// # Returns
    /// The URI of the finished media; it may take a moment to appear
    async fn finish(&self) -> Result<String, RecordingError>;

    /// Stop capturing and drop everything captured so far
    async fn discard(&self);
}
