//! Playback domain module

mod session;
mod status;

pub use session::{PlaybackSession, PlaybackState};
pub use status::{progress_of, PlaybackStatus};
