//! Playback infrastructure adapters
//!
//! Decodes local or downloaded media with rodio.

mod rodio;
mod source;

pub use self::rodio::{RodioAudioOutput, RodioPlayback};
pub use source::SourceLoader;
