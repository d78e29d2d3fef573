//! Shared fakes for controller integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use voicenote::application::ports::{
    AudioInput, AudioOutput, CaptureHandle, DeviceStatus, PlaybackError, PlaybackHandle,
    RecordingError,
};
use voicenote::domain::playback::PlaybackStatus;
use voicenote::domain::recording::RecordingPreset;

/// Capture that writes a small file into `dir` when finished
pub struct FakeCapture {
    dir: PathBuf,
    level_db: f32,
    discarded: Arc<AtomicBool>,
}

#[async_trait]
impl CaptureHandle for FakeCapture {
    fn level_db(&self) -> Option<f32> {
        Some(self.level_db)
    }

    async fn pause(&self) -> Result<(), RecordingError> {
        Ok(())
    }

    async fn resume(&self) -> Result<(), RecordingError> {
        Ok(())
    }

    async fn finish(&self) -> Result<String, RecordingError> {
        let path = self.dir.join("voice-test.flac");
        std::fs::write(&path, b"fLaC fake")
            .map_err(|e| RecordingError::TransientIo(e.to_string()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn discard(&self) {
        self.discarded.store(true, Ordering::SeqCst);
    }
}

/// Input device producing `FakeCapture`s
pub struct FakeInput {
    pub dir: PathBuf,
    pub level_db: f32,
    pub discarded: Arc<AtomicBool>,
    pub begun: Arc<AtomicUsize>,
}

impl FakeInput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            level_db: -20.0,
            discarded: Arc::new(AtomicBool::new(false)),
            begun: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl AudioInput for FakeInput {
    async fn begin(
        &self,
        _preset: &RecordingPreset,
    ) -> Result<Box<dyn CaptureHandle>, RecordingError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCapture {
            dir: self.dir.clone(),
            level_db: self.level_db,
            discarded: Arc::clone(&self.discarded),
        }))
    }
}

/// Playback whose position follows tokio time while playing
pub struct FakeHandle {
    duration_millis: u64,
    offset: Mutex<u64>,
    playing_since: Mutex<Option<Instant>>,
    close_delay: Duration,
    closed: Arc<AtomicUsize>,
}

impl FakeHandle {
    fn position(&self) -> u64 {
        let offset = *self.offset.lock().unwrap();
        let running = self
            .playing_since
            .lock()
            .unwrap()
            .map_or(0, |since| since.elapsed().as_millis() as u64);
        (offset + running).min(self.duration_millis)
    }
}

#[async_trait]
impl PlaybackHandle for FakeHandle {
    async fn play(&self) -> Result<(), PlaybackError> {
        self.playing_since
            .lock()
            .unwrap()
            .get_or_insert_with(Instant::now);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        let position = self.position();
        *self.offset.lock().unwrap() = position;
        *self.playing_since.lock().unwrap() = None;
        Ok(())
    }

    async fn seek(&self, position_millis: u64) -> Result<(), PlaybackError> {
        *self.offset.lock().unwrap() = position_millis;
        let mut since = self.playing_since.lock().unwrap();
        if since.is_some() {
            *since = Some(Instant::now());
        }
        Ok(())
    }

    fn status(&self) -> DeviceStatus {
        let position = self.position();
        DeviceStatus {
            is_playing: self.playing_since.lock().unwrap().is_some(),
            position_millis: position,
            duration_millis: Some(self.duration_millis),
            finished: position >= self.duration_millis,
        }
    }

    async fn close(&self) {
        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Output that opens every uri except the ones listed as missing
pub struct FakeOutput {
    pub duration_millis: u64,
    pub missing: Vec<String>,
    /// How long each `close` takes, like joining a device thread
    pub close_delay: Duration,
    pub opened: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
}

impl FakeOutput {
    pub fn new(duration_millis: u64) -> Self {
        Self {
            duration_millis,
            missing: Vec::new(),
            close_delay: Duration::ZERO,
            opened: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn open(&self, uri: &str) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        if self.missing.iter().any(|m| m == uri) {
            return Err(PlaybackError::SourceUnavailable(uri.to_string()));
        }
        self.opened.lock().unwrap().push(uri.to_string());
        Ok(Box::new(FakeHandle {
            duration_millis: self.duration_millis,
            offset: Mutex::new(0),
            playing_since: Mutex::new(None),
            close_delay: self.close_delay,
            closed: Arc::clone(&self.closed),
        }))
    }
}

pub type Events = Arc<Mutex<Vec<PlaybackStatus>>>;

/// Listener that records every status it receives
pub fn collector() -> (Events, impl Fn(&PlaybackStatus) + Send + Sync + 'static) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    (events, move |status: &PlaybackStatus| {
        sink.lock().unwrap().push(status.clone())
    })
}
