//! Recording result value object

use serde::{Deserialize, Serialize};

/// A finished recording, as consumed by the message-send flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResult {
    /// Location of the encoded media
    pub uri: String,
    /// Active recording time in seconds
    pub duration: f64,
    /// Normalized amplitude samples in [0, 1]
    pub metering_values: Vec<f32>,
    /// Encoded size in bytes
    pub size: u64,
}

impl RecordingResult {
    /// Human-readable encoded size (e.g. "12.4 KB")
    pub fn human_readable_size(&self) -> String {
        human_readable_bytes(self.size)
    }
}

/// Format a byte count for display
pub fn human_readable_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes as u64)
    }
}
