//! Playback session entity

use std::fmt;

use super::status::PlaybackStatus;

/// Playback states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Unloaded,
    Playing,
    Paused,
}

impl PlaybackState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single active playback.
///
/// `source_uri` is what the caller asked for; `opened_uri` is what was
/// actually opened, which differs when a cached local replica was used.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    source_uri: String,
    opened_uri: String,
    state: PlaybackState,
    position_millis: u64,
    duration_millis: u64,
}

impl PlaybackSession {
    /// A freshly opened session, not yet playing
    pub fn opened(source_uri: impl Into<String>, opened_uri: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            opened_uri: opened_uri.into(),
            state: PlaybackState::Paused,
            position_millis: 0,
            duration_millis: 0,
        }
    }

    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    pub fn opened_uri(&self) -> &str {
        &self.opened_uri
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    pub fn position_millis(&self) -> u64 {
        self.position_millis
    }

    pub fn duration_millis(&self) -> u64 {
        self.duration_millis
    }

    /// Fold a device reading into the session and produce the listener event
    pub fn observe(
        &mut self,
        is_playing: bool,
        position_millis: u64,
        duration_millis: Option<u64>,
    ) -> PlaybackStatus {
        if let Some(duration) = duration_millis {
            self.duration_millis = duration;
        }
        self.position_millis = match self.duration_millis {
            0 => position_millis,
            duration => position_millis.min(duration),
        };
        self.state = if is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        self.status()
    }

    /// Current status as a listener event
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::loaded(
            self.source_uri.clone(),
            self.is_playing(),
            self.position_millis,
            self.duration_millis,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opened_session_is_paused_at_start() {
        let session = PlaybackSession::opened("https://cdn/a.m4a", "/cache/a.m4a");
        assert_eq!(session.state(), PlaybackState::Paused);
        assert_eq!(session.source_uri(), "https://cdn/a.m4a");
        assert_eq!(session.opened_uri(), "/cache/a.m4a");
        assert_eq!(session.position_millis(), 0);
    }

    #[test]
    fn observe_updates_position_and_progress() {
        let mut session = PlaybackSession::opened("a", "a");
        let status = session.observe(true, 500, Some(2000));
        assert!(status.is_playing);
        assert!(status.is_loaded);
        assert_eq!(status.progress, 0.25);
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[test]
    fn observe_keeps_known_duration() {
        let mut session = PlaybackSession::opened("a", "a");
        session.observe(true, 0, Some(1000));
        let status = session.observe(true, 400, None);
        assert_eq!(status.duration_millis, 1000);
        assert_eq!(status.progress, 0.4);
    }

    #[test]
    fn observe_clamps_position_to_duration() {
        let mut session = PlaybackSession::opened("a", "a");
        let status = session.observe(false, 1200, Some(1000));
        assert_eq!(status.position_millis, 1000);
        assert!(status.is_complete());
    }
}
