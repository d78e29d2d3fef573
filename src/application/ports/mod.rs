//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod clock;
pub mod config;
pub mod media_files;
pub mod permission;
pub mod player;
pub mod recorder;
pub mod routing;
pub mod storage;

// Re-export common types
pub use clock::Clock;
pub use config::ConfigStore;
pub use media_files::{MediaFileError, MediaFiles};
pub use permission::{MicrophonePermission, PermissionStatus};
pub use player::{AudioOutput, DeviceStatus, PlaybackError, PlaybackHandle};
pub use recorder::{AudioInput, CaptureHandle, RecordingError};
pub use routing::{AudioMode, AudioRouting, RoutingError};
pub use storage::{KeyValueStorage, StorageError};
