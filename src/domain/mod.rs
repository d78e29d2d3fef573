//! Domain layer - Core engine logic
//!
//! Contains value objects, state machines, and domain errors.
//! This layer has no dependencies on devices, storage, or the runtime.

pub mod cache;
pub mod config;
pub mod duration;
pub mod error;
pub mod playback;
pub mod recording;
pub mod waveform;

// Re-export common types
pub use cache::{CacheEntry, CacheStats, MediaType};
pub use config::EngineConfig;
pub use duration::Duration;
pub use error::*;
pub use playback::{PlaybackSession, PlaybackState, PlaybackStatus};
pub use recording::{RecorderState, RecordingPreset, RecordingResult, RecordingSession};
pub use waveform::{sample_bars, waveform_bars};
