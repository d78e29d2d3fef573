//! Waveform domain module

mod sampler;

pub use sampler::{sample_bars, seeded_pattern, waveform_bars, FALLBACK_LEVEL};
