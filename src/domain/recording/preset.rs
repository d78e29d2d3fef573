//! Recording encoder presets

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidPresetError;

/// Encoder preset used when finalising a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingPreset {
    /// 44.1kHz mono, for messages that may be replayed many times
    #[default]
    HighQuality,
    /// 16kHz mono, speech-optimized and small
    LowQuality,
}

impl RecordingPreset {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HighQuality => "high",
            Self::LowQuality => "low",
        }
    }

    /// Output sample rate in Hz
    pub const fn sample_rate(&self) -> u32 {
        match self {
            Self::HighQuality => 44_100,
            Self::LowQuality => 16_000,
        }
    }

    /// Output channel count
    pub const fn channels(&self) -> u16 {
        1
    }

    pub const fn bits_per_sample(&self) -> u16 {
        16
    }

    /// File extension of the encoded output
    pub const fn extension(&self) -> &'static str {
        "flac"
    }
}

impl FromStr for RecordingPreset {
    type Err = InvalidPresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "high-quality" => Ok(Self::HighQuality),
            "low" | "low-quality" => Ok(Self::LowQuality),
            _ => Err(InvalidPresetError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RecordingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
