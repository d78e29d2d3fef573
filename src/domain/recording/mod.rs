//! Recording domain module

mod metering;
mod preset;
mod result;
mod session;

pub use metering::{normalize_level, rms_dbfs, METER_FLOOR_DB, SILENCE_DB};
pub use preset::RecordingPreset;
pub use result::{human_readable_bytes, RecordingResult};
pub use session::{FinishedRecording, InvalidStateTransition, RecorderState, RecordingSession};
