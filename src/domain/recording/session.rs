//! Recording session state machine

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use thiserror::Error;

use super::metering::normalize_level;

/// Recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl RecorderState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: RecorderState,
    pub action: String,
}

impl InvalidStateTransition {
    pub fn new(current_state: RecorderState, action: &str) -> Self {
        Self {
            current_state,
            action: action.to_string(),
        }
    }
}

/// What remains of a session once it has been stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRecording {
    /// Active (unpaused) recording time
    pub duration: StdDuration,
    /// Normalized amplitude samples, non-finite values removed
    pub metering_values: Vec<f32>,
}

/// A single recording session.
///
/// State machine:
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   RECORDING | PAUSED -> finished (finish, consumes the session)
///
/// Paused intervals do not count toward the duration, and samples offered
/// while paused are dropped.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    state: RecorderState,
    started_at: Instant,
    /// Active time accumulated by completed recording segments
    accumulated: StdDuration,
    /// Start of the current recording segment, `None` while paused
    segment_start: Option<Instant>,
    samples: Vec<f32>,
}

impl RecordingSession {
    /// Begin a new session in recording state
    pub fn start(now: Instant) -> Self {
        Self {
            state: RecorderState::Recording,
            started_at: now,
            accumulated: StdDuration::ZERO,
            segment_start: Some(now),
            samples: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecorderState::Paused
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self, now: Instant) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Recording {
            return Err(InvalidStateTransition::new(self.state, "pause"));
        }
        if let Some(segment_start) = self.segment_start.take() {
            self.accumulated += now.saturating_duration_since(segment_start);
        }
        self.state = RecorderState::Paused;
        Ok(())
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self, now: Instant) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Paused {
            return Err(InvalidStateTransition::new(self.state, "resume"));
        }
        self.segment_start = Some(now);
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Offer a raw level reading (dBFS). Returns the normalized value when it
    /// was appended; unavailable readings and readings taken while paused are
    /// skipped rather than zero-filled.
    pub fn record_level(&mut self, raw_db: Option<f32>) -> Option<f32> {
        if self.state != RecorderState::Recording {
            return None;
        }
        let normalized = normalize_level(raw_db?)?;
        self.samples.push(normalized);
        Some(normalized)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Active recording time up to `now`
    pub fn elapsed(&self, now: Instant) -> StdDuration {
        match self.segment_start {
            Some(segment_start) => self.accumulated + now.saturating_duration_since(segment_start),
            None => self.accumulated,
        }
    }

    /// Consume the session
    pub fn finish(self, now: Instant) -> FinishedRecording {
        let duration = self.elapsed(now);
        let metering_values = self.samples.into_iter().filter(|v| v.is_finite()).collect();
        FinishedRecording {
            duration,
            metering_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> StdDuration {
        StdDuration::from_millis(n)
    }

    #[test]
    fn new_session_is_recording() {
        let session = RecordingSession::start(Instant::now());
        assert!(session.is_recording());
        assert!(!session.is_paused());
        assert!(session.samples().is_empty());
    }

    #[test]
    fn pause_and_resume() {
        let t0 = Instant::now();
        let mut session = RecordingSession::start(t0);
        session.pause(t0 + ms(500)).unwrap();
        assert!(session.is_paused());
        session.resume(t0 + ms(900)).unwrap();
        assert!(session.is_recording());
    }

    #[test]
    fn pause_from_paused_fails() {
        let t0 = Instant::now();
        let mut session = RecordingSession::start(t0);
        session.pause(t0).unwrap();

        let err = session.pause(t0).unwrap_err();
        assert_eq!(err.current_state, RecorderState::Paused);
        assert!(err.action.contains("pause"));
    }

    #[test]
    fn resume_from_recording_fails() {
        let t0 = Instant::now();
        let mut session = RecordingSession::start(t0);

        let err = session.resume(t0).unwrap_err();
        assert_eq!(err.current_state, RecorderState::Recording);
    }

    #[test]
    fn paused_time_excluded_from_elapsed() {
        let t0 = Instant::now();
        let mut session = RecordingSession::start(t0);
        session.pause(t0 + ms(1000)).unwrap();
        assert_eq!(session.elapsed(t0 + ms(5000)), ms(1000));
        session.resume(t0 + ms(5000)).unwrap();
        assert_eq!(session.elapsed(t0 + ms(5500)), ms(1500));
    }

    #[test]
    fn levels_are_normalized_and_unavailable_skipped() {
        let mut session = RecordingSession::start(Instant::now());
        assert_eq!(session.record_level(Some(-30.0)), Some(0.5));
        assert_eq!(session.record_level(None), None);
        assert_eq!(session.record_level(Some(f32::NAN)), None);
        assert_eq!(session.record_level(Some(-90.0)), Some(0.0));
        assert_eq!(session.samples(), &[0.5, 0.0]);
    }

    #[test]
    fn samples_dropped_while_paused() {
        let t0 = Instant::now();
        let mut session = RecordingSession::start(t0);
        session.record_level(Some(0.0));
        session.pause(t0).unwrap();
        assert_eq!(session.record_level(Some(0.0)), None);
        session.resume(t0).unwrap();
        session.record_level(Some(-60.0));
        assert_eq!(session.samples().len(), 2);
    }

    #[test]
    fn finish_reports_duration_and_samples() {
        let t0 = Instant::now();
        let mut session = RecordingSession::start(t0);
        session.record_level(Some(-6.0));
        session.record_level(Some(-12.0));

        let finished = session.finish(t0 + ms(2000));
        assert_eq!(finished.duration, ms(2000));
        assert_eq!(finished.metering_values.len(), 2);
        assert!(finished.metering_values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn state_display() {
        assert_eq!(RecorderState::Idle.to_string(), "idle");
        assert_eq!(RecorderState::Recording.to_string(), "recording");
        assert_eq!(RecorderState::Paused.to_string(), "paused");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition::new(RecorderState::Idle, "stop");
        let msg = err.to_string();
        assert!(msg.contains("stop"));
        assert!(msg.contains("idle"));
    }
}
