//! Application layer - Controllers and port interfaces
//!
//! Contains the recording, playback and caching operations and the trait
//! definitions for the devices and storage they drive.

pub mod arbiter;
pub mod cache;
pub mod player;
pub mod ports;
pub mod recorder;
pub mod subscription;

// Re-export controllers
pub use arbiter::{ArbiterError, AudioLease, AudioOwner, AudioSessionArbiter, RoutingOutcome};
pub use cache::{MediaCacheStore, CACHE_STORAGE_KEY};
pub use player::{LoadOutcome, PlayerConfig, PlayerController};
pub use recorder::{RecorderConfig, RecorderController, StartOutcome};
pub use subscription::{Listeners, Subscriber, Subscription};
