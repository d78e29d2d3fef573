//! Audio device adapters: routing and microphone access

mod permission;
mod routing;

pub use permission::{DevicePermission, StaticPermission};
pub use routing::{CpalRouting, NoOpRouting};
