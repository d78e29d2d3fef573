//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with cpal, rodio, the filesystem and HTTP.

pub mod clock;
pub mod config;
pub mod device;
pub mod media_files;
pub mod playback;
pub mod recording;
pub mod storage;

// Re-export adapters
pub use clock::{ManualClock, SystemClock};
pub use config::XdgConfigStore;
pub use device::{CpalRouting, DevicePermission, NoOpRouting, StaticPermission};
pub use media_files::LocalMediaFiles;
pub use playback::{RodioAudioOutput, SourceLoader};
pub use recording::CpalAudioInput;
pub use storage::{JsonFileStorage, MemoryStorage};
