//! Voice recording controller

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::config::EngineConfig;
use crate::domain::duration::Duration;
use crate::domain::recording::{
    InvalidStateTransition, RecorderState, RecordingPreset, RecordingResult, RecordingSession,
};

use super::arbiter::{AudioLease, AudioOwner, AudioSessionArbiter, RoutingOutcome};
use super::ports::{
    AudioInput, CaptureHandle, MediaFiles, MicrophonePermission, PermissionStatus, RecordingError,
};
use super::subscription::{Listeners, Subscription};

/// Recorder settings
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub preset: RecordingPreset,
    /// How often the input level is sampled
    pub metering_interval: Duration,
    /// Delay before the single re-check of a missing recording
    pub existence_retry: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            preset: RecordingPreset::default(),
            metering_interval: Duration::default_metering_interval(),
            existence_retry: Duration::default_existence_retry(),
        }
    }
}

impl From<&EngineConfig> for RecorderConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            preset: config.preset_or_default(),
            metering_interval: config.metering_interval_or_default(),
            existence_retry: config.existence_retry_or_default(),
        }
    }
}

/// How a successful `start` went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Capturing, but the device could not be routed for recording
    Degraded { reason: String },
}

struct ActiveRecording {
    session: RecordingSession,
    capture: Arc<dyn CaptureHandle>,
    sampler: JoinHandle<()>,
    _lease: AudioLease,
}

/// Owns at most one recording session.
///
/// Lifecycle calls on one instance must not overlap; `cancel` is safe at
/// any time.
pub struct RecorderController<I, P, F>
where
    I: AudioInput,
    P: MicrophonePermission,
    F: MediaFiles,
{
    input: I,
    permission: P,
    files: F,
    arbiter: Arc<AudioSessionArbiter>,
    owner: AudioOwner,
    config: RecorderConfig,
    active: Arc<Mutex<Option<ActiveRecording>>>,
    metering: Listeners<f32>,
}

impl<I, P, F> RecorderController<I, P, F>
where
    I: AudioInput,
    P: MicrophonePermission,
    F: MediaFiles,
{
    /// Create a new recorder instance
    pub fn new(
        input: I,
        permission: P,
        files: F,
        arbiter: Arc<AudioSessionArbiter>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            input,
            permission,
            files,
            arbiter,
            owner: AudioOwner::recorder(),
            config,
            active: Arc::new(Mutex::new(None)),
            metering: Listeners::new(),
        }
    }

    /// Identity this recorder holds the audio session under
    pub fn owner(&self) -> AudioOwner {
        self.owner
    }

    pub fn state(&self) -> RecorderState {
        self.lock()
            .as_ref()
            .map_or(RecorderState::Idle, |active| active.session.state())
    }

    /// Active (unpaused) time of the current session
    pub fn elapsed(&self) -> StdDuration {
        let now = Instant::now().into_std();
        self.lock()
            .as_ref()
            .map_or(StdDuration::ZERO, |active| active.session.elapsed(now))
    }

    /// Normalized samples collected so far in the current session
    pub fn metering_snapshot(&self) -> Vec<f32> {
        self.lock()
            .as_ref()
            .map(|active| active.session.samples().to_vec())
            .unwrap_or_default()
    }

    /// Receive every normalized sample as it is collected
    pub fn subscribe_metering<L>(&self, listener: L) -> Subscription
    where
        L: Fn(&f32) + Send + Sync + 'static,
    {
        self.metering.subscribe(listener)
    }

    /// Begin a new recording.
    ///
    /// Requests microphone permission if it was never asked for. The session
    /// is only considered started once the capture device is running.
    pub async fn start(&self) -> Result<StartOutcome, RecordingError> {
        if let Some(state) = self.lock().as_ref().map(|a| a.session.state()) {
            return Err(InvalidStateTransition::new(state, "start").into());
        }

        self.ensure_permission().await?;

        let (lease, routing) = self.arbiter.acquire(self.owner).await?;

        let capture: Arc<dyn CaptureHandle> = match self.input.begin(&self.config.preset).await {
            Ok(capture) => Arc::from(capture),
            Err(e) => {
                warn!(error = %e, "could not open capture device");
                return Err(e);
            }
        };

        {
            let mut active = self.lock();
            let session = RecordingSession::start(Instant::now().into_std());
            let sampler = self.spawn_sampler(Arc::clone(&capture));
            *active = Some(ActiveRecording {
                session,
                capture,
                sampler,
                _lease: lease,
            });
        }

        info!(preset = %self.config.preset, "recording started");

        Ok(match routing {
            RoutingOutcome::Degraded(reason) => StartOutcome::Degraded { reason },
            RoutingOutcome::Applied | RoutingOutcome::Unchanged => StartOutcome::Started,
        })
    }

    /// Pause capturing; collected samples are kept
    pub async fn pause(&self) -> Result<(), RecordingError> {
        let capture = self.capture_in(RecorderState::Recording, "pause")?;
        capture.pause().await?;
        if let Some(active) = self.lock().as_mut() {
            active.session.pause(Instant::now().into_std())?;
        }
        debug!("recording paused");
        Ok(())
    }

    /// Resume a paused recording
    pub async fn resume(&self) -> Result<(), RecordingError> {
        let capture = self.capture_in(RecorderState::Paused, "resume")?;
        capture.resume().await?;
        if let Some(active) = self.lock().as_mut() {
            active.session.resume(Instant::now().into_std())?;
        }
        debug!("recording resumed");
        Ok(())
    }

    /// Finish the recording.
    ///
    /// The sampling timer is stopped before anything else. If the finished
    /// media cannot be found the recording is lost; nothing partial is kept.
    pub async fn stop(&self) -> Result<RecordingResult, RecordingError> {
        let active = self
            .lock()
            .take()
            .ok_or_else(|| InvalidStateTransition::new(RecorderState::Idle, "stop"))?;
        active.sampler.abort();

        let ActiveRecording {
            session,
            capture,
            _lease,
            ..
        } = active;
        let finished = session.finish(Instant::now().into_std());

        let uri = match capture.finish().await {
            Ok(uri) => uri,
            Err(e) => {
                warn!(error = %e, "recording could not be finalised");
                return Err(e);
            }
        };

        let size = match self.check_size(&uri).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(remove_err) = self.files.remove(&uri).await {
                    debug!(uri = %uri, error = %remove_err, "leftover recording not removed");
                }
                return Err(e);
            }
        };

        info!(
            uri = %uri,
            duration_secs = finished.duration.as_secs_f64(),
            samples = finished.metering_values.len(),
            size,
            "recording stopped"
        );

        Ok(RecordingResult {
            uri,
            duration: finished.duration.as_secs_f64(),
            metering_values: finished.metering_values,
            size,
        })
    }

    /// Abandon the current recording, if any. Never fails.
    pub async fn cancel(&self) {
        let Some(active) = self.lock().take() else {
            return;
        };
        active.sampler.abort();
        active.capture.discard().await;
        info!("recording cancelled");
    }

    async fn ensure_permission(&self) -> Result<(), RecordingError> {
        let status = match self.permission.status().await {
            PermissionStatus::Granted => return Ok(()),
            PermissionStatus::Undetermined => self.permission.request().await,
            PermissionStatus::Denied => PermissionStatus::Denied,
        };
        if status.is_granted() {
            Ok(())
        } else {
            warn!("microphone permission denied");
            Err(RecordingError::PermissionDenied)
        }
    }

    /// Size of the finished media, checking a second time after a delay
    async fn check_size(&self, uri: &str) -> Result<u64, RecordingError> {
        match self.files.size_of(uri).await {
            Ok(Some(size)) => return Ok(size),
            Ok(None) => debug!(uri, "recording not on disk yet, retrying"),
            Err(e) => warn!(uri, error = %e, "existence check failed, retrying"),
        }

        tokio::time::sleep(self.config.existence_retry.as_std()).await;

        match self.files.size_of(uri).await {
            Ok(Some(size)) => Ok(size),
            Ok(None) => Err(RecordingError::ResourceNotFound(uri.to_string())),
            Err(e) => {
                warn!(uri, error = %e, "existence check failed twice");
                Err(RecordingError::ResourceNotFound(uri.to_string()))
            }
        }
    }

    fn capture_in(
        &self,
        required: RecorderState,
        action: &str,
    ) -> Result<Arc<dyn CaptureHandle>, RecordingError> {
        let active = self.lock();
        let state = active
            .as_ref()
            .map_or(RecorderState::Idle, |a| a.session.state());
        match active.as_ref() {
            Some(a) if state == required => Ok(Arc::clone(&a.capture)),
            _ => Err(InvalidStateTransition::new(state, action).into()),
        }
    }

    fn spawn_sampler(&self, capture: Arc<dyn CaptureHandle>) -> JoinHandle<()> {
        let active = Arc::clone(&self.active);
        let listeners = self.metering.clone();
        let period = self.config.metering_interval.as_std();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let level = capture.level_db();
                let appended = {
                    let mut guard = active.lock().unwrap_or_else(PoisonError::into_inner);
                    match guard.as_mut() {
                        Some(recording) => recording.session.record_level(level),
                        None => break,
                    }
                };
                if let Some(sample) = appended {
                    listeners.emit(&sample);
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveRecording>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I, P, F> Drop for RecorderController<I, P, F>
where
    I: AudioInput,
    P: MicrophonePermission,
    F: MediaFiles,
{
    fn drop(&mut self) {
        if let Some(active) = self.lock().take() {
            active.sampler.abort();
        }
    }
}
