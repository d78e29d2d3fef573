//! Recording infrastructure module
//!
//! Microphone capture through cpal. Finished recordings are resampled to
//! the preset rate and stored as FLAC.

mod cpal_recorder;
mod flac_encoder;

pub use cpal_recorder::{CpalAudioInput, CpalCapture};
pub use flac_encoder::{encode_to_flac, EncodingError};
