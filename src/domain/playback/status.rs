//! Playback progress events

use serde::{Deserialize, Serialize};

/// Fraction of the media played, in [0, 1].
///
/// An unknown or zero duration reports 0.
pub fn progress_of(position_millis: u64, duration_millis: u64) -> f64 {
    if duration_millis == 0 {
        return 0.0;
    }
    (position_millis as f64 / duration_millis as f64).clamp(0.0, 1.0)
}

/// Per-tick status delivered to a playback listener.
///
/// `source` is the URI the session was loaded with. A listener that may
/// outlive its session compares it against the URI it requested before
/// acting on the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub source: String,
    pub is_playing: bool,
    pub is_loaded: bool,
    pub position_millis: u64,
    pub duration_millis: u64,
    pub progress: f64,
}

impl PlaybackStatus {
    /// Status of a loaded session
    pub fn loaded(
        source: impl Into<String>,
        is_playing: bool,
        position_millis: u64,
        duration_millis: u64,
    ) -> Self {
        Self {
            source: source.into(),
            is_playing,
            is_loaded: true,
            position_millis,
            duration_millis,
            progress: progress_of(position_millis, duration_millis),
        }
    }

    /// Terminal event emitted when a session is torn down
    pub fn unloaded(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            is_playing: false,
            is_loaded: false,
            position_millis: 0,
            duration_millis: 0,
            progress: 0.0,
        }
    }

    /// Whether this event reports the end of the media
    pub fn is_complete(&self) -> bool {
        self.is_loaded && self.duration_millis > 0 && self.progress >= 1.0
    }

    /// Whether this event belongs to the given source
    pub fn is_for(&self, source: &str) -> bool {
        self.source == source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_position_over_duration() {
        assert_eq!(progress_of(500, 2000), 0.25);
        assert_eq!(progress_of(2000, 2000), 1.0);
    }

    #[test]
    fn progress_zero_without_duration() {
        assert_eq!(progress_of(500, 0), 0.0);
    }

    #[test]
    fn progress_clamped() {
        assert_eq!(progress_of(2500, 2000), 1.0);
    }

    #[test]
    fn unloaded_event_is_terminal_reset() {
        let status = PlaybackStatus::unloaded("a");
        assert!(!status.is_playing);
        assert!(!status.is_loaded);
        assert_eq!(status.progress, 0.0);
        assert!(status.is_for("a"));
        assert!(!status.is_complete());
    }

    #[test]
    fn completion_requires_known_duration() {
        assert!(PlaybackStatus::loaded("a", false, 1000, 1000).is_complete());
        assert!(!PlaybackStatus::loaded("a", true, 1000, 0).is_complete());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(PlaybackStatus::loaded("a", true, 10, 100)).unwrap();
        assert_eq!(json["isPlaying"], true);
        assert_eq!(json["positionMillis"], 10);
        assert_eq!(json["durationMillis"], 100);
    }
}
