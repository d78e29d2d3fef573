//! Voice message playback controller

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::config::EngineConfig;
use crate::domain::duration::Duration;
use crate::domain::playback::{PlaybackSession, PlaybackState, PlaybackStatus};

use super::arbiter::{AudioLease, AudioOwner, AudioSessionArbiter, RoutingOutcome};
use super::cache::MediaCacheStore;
use super::ports::{AudioOutput, PlaybackError, PlaybackHandle};
use super::subscription::{Subscriber, Subscription};

/// Player settings
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// How often listeners receive a status event
    pub status_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::default_status_interval(),
        }
    }
}

impl From<&EngineConfig> for PlayerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            status_interval: config.status_interval_or_default(),
        }
    }
}

/// How a successful `load` went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Playing {
        /// A cached local replica was opened instead of the source
        from_cache: bool,
    },
    /// Playing, but the device could not be routed for playback
    Degraded { from_cache: bool, reason: String },
}

impl LoadOutcome {
    pub fn from_cache(&self) -> bool {
        match self {
            Self::Playing { from_cache } | Self::Degraded { from_cache, .. } => *from_cache,
        }
    }
}

struct ActivePlayback {
    generation: u64,
    session: PlaybackSession,
    handle: Arc<dyn PlaybackHandle>,
    listener: Subscriber<PlaybackStatus>,
    poller: Option<JoinHandle<()>>,
    _lease: AudioLease,
}

impl ActivePlayback {
    /// Emit the terminal event and release the device
    async fn retire(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.listener
            .finish(&PlaybackStatus::unloaded(self.session.source_uri()));
        self.handle.close().await;
        debug!(source = self.session.source_uri(), "playback unloaded");
    }
}

type Shared = Arc<Mutex<Option<ActivePlayback>>>;

fn lock_shared(active: &Shared) -> MutexGuard<'_, Option<ActivePlayback>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns at most one playback at a time.
///
/// Loading a new source tears the previous one down first, and the previous
/// listener receives nothing after its terminal reset event.
pub struct PlayerController<O: AudioOutput> {
    output: O,
    cache: Option<Arc<MediaCacheStore>>,
    arbiter: Arc<AudioSessionArbiter>,
    owner: AudioOwner,
    config: PlayerConfig,
    active: Shared,
    generation: AtomicU64,
}

impl<O: AudioOutput> PlayerController<O> {
    pub fn new(output: O, arbiter: Arc<AudioSessionArbiter>, config: PlayerConfig) -> Self {
        Self {
            output,
            cache: None,
            arbiter,
            owner: AudioOwner::player(),
            config,
            active: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Consult `cache` for a local replica before opening remote sources
    pub fn with_cache(mut self, cache: Arc<MediaCacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn owner(&self) -> AudioOwner {
        self.owner
    }

    /// Status of the active session, if any
    pub fn status(&self) -> Option<PlaybackStatus> {
        self.lock().as_ref().map(|p| p.session.status())
    }

    /// URI the active session was loaded with
    pub fn current_source(&self) -> Option<String> {
        self.lock()
            .as_ref()
            .map(|p| p.session.source_uri().to_string())
    }

    pub fn state(&self) -> PlaybackState {
        self.lock()
            .as_ref()
            .map_or(PlaybackState::Unloaded, |p| p.session.state())
    }

    /// Load and start playing `uri`, reporting status to `listener`.
    ///
    /// Any active session is unloaded first. On failure the listener gets a
    /// single reset event and the error is returned.
    pub async fn load<L>(
        &self,
        uri: &str,
        listener: L,
    ) -> Result<(LoadOutcome, Subscription), PlaybackError>
    where
        L: Fn(&PlaybackStatus) + Send + Sync + 'static,
    {
        self.unload().await;

        let subscriber = Subscriber::new(listener);
        let subscription = subscriber.subscription();

        match self.open(uri, subscriber.clone()).await {
            Ok(outcome) => {
                info!(uri, from_cache = outcome.from_cache(), "playback started");
                Ok((outcome, subscription))
            }
            Err(e) => {
                warn!(uri, error = %e, "failed to load media");
                subscriber.finish(&PlaybackStatus::unloaded(uri));
                Err(e)
            }
        }
    }

    /// Pause the active session. No-op unless playing.
    pub async fn pause(&self) {
        self.transition(PlaybackState::Playing, PlaybackState::Paused)
            .await;
    }

    /// Resume the active session. No-op unless paused.
    pub async fn resume(&self) {
        self.transition(PlaybackState::Paused, PlaybackState::Playing)
            .await;
    }

    /// Move the active session to `position_millis`, clamped to the known
    /// duration. No-op without a session.
    pub async fn seek_to(&self, position_millis: u64) {
        let Some((handle, duration)) = self
            .lock()
            .as_ref()
            .map(|p| (Arc::clone(&p.handle), p.session.duration_millis()))
        else {
            return;
        };
        let target = match duration {
            0 => position_millis,
            d => position_millis.min(d),
        };
        if let Err(e) = handle.seek(target).await {
            warn!(position_millis = target, error = %e, "seek failed");
        }
    }

    /// Tear down the active session. Idempotent, never fails.
    pub async fn unload(&self) {
        let previous = self.lock().take();
        if let Some(previous) = previous {
            previous.retire().await;
        }
    }

    async fn open(
        &self,
        uri: &str,
        subscriber: Subscriber<PlaybackStatus>,
    ) -> Result<LoadOutcome, PlaybackError> {
        let (lease, routing) = self.arbiter.acquire(self.owner).await?;
        let (handle, opened_uri, from_cache) = self.open_source(uri).await?;
        let handle: Arc<dyn PlaybackHandle> = Arc::from(handle);

        if let Err(e) = handle.play().await {
            handle.close().await;
            return Err(e);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut session = PlaybackSession::opened(uri, opened_uri);
        session.set_state(PlaybackState::Playing);
        subscriber.notify(&session.status());

        let superseded = {
            let mut active = self.lock();
            let poller = self.spawn_poller(generation);
            active.replace(ActivePlayback {
                generation,
                session,
                handle,
                listener: subscriber,
                poller: Some(poller),
                _lease: lease,
            })
        };
        if let Some(previous) = superseded {
            previous.retire().await;
        }

        Ok(match routing {
            RoutingOutcome::Degraded(reason) => LoadOutcome::Degraded { from_cache, reason },
            RoutingOutcome::Applied | RoutingOutcome::Unchanged => LoadOutcome::Playing { from_cache },
        })
    }

    /// Open the cached replica when there is one, the source otherwise
    async fn open_source(
        &self,
        uri: &str,
    ) -> Result<(Box<dyn PlaybackHandle>, String, bool), PlaybackError> {
        if let Some(cache) = &self.cache {
            match cache.resolve(uri).await {
                Ok(Some(local)) => match self.output.open(&local).await {
                    Ok(handle) => return Ok((handle, local, true)),
                    Err(e) => {
                        warn!(uri, local = %local, error = %e, "cached copy unusable, using source")
                    }
                },
                Ok(None) => {}
                Err(e) => warn!(uri, error = %e, "cache lookup failed, using source"),
            }
        }

        let handle = self.output.open(uri).await?;
        Ok((handle, uri.to_string(), false))
    }

    async fn transition(&self, from: PlaybackState, to: PlaybackState) {
        let Some((generation, handle)) = self
            .lock()
            .as_ref()
            .filter(|p| p.session.state() == from)
            .map(|p| (p.generation, Arc::clone(&p.handle)))
        else {
            return;
        };

        let result = match to {
            PlaybackState::Playing => handle.play().await,
            _ => handle.pause().await,
        };

        match result {
            Ok(()) => {
                if let Some(playback) = self
                    .lock()
                    .as_mut()
                    .filter(|p| p.generation == generation)
                {
                    playback.session.set_state(to);
                }
                debug!(state = %to, "playback state changed");
            }
            Err(e) => warn!(target_state = %to, error = %e, "playback command failed"),
        }
    }

    fn spawn_poller(&self, generation: u64) -> JoinHandle<()> {
        let active = Arc::clone(&self.active);
        let period = self.config.status_interval.as_std();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;

                let (event, completed) = {
                    let mut guard = lock_shared(&active);
                    let Some(playback) = guard.as_mut().filter(|p| p.generation == generation)
                    else {
                        break;
                    };
                    let device = playback.handle.status();
                    let status = playback.session.observe(
                        device.is_playing,
                        device.position_millis,
                        device.duration_millis,
                    );
                    if device.finished || status.is_complete() {
                        (None, guard.take())
                    } else {
                        (Some((playback.listener.clone(), status)), None)
                    }
                };

                if let Some((listener, status)) = event {
                    listener.notify(&status);
                }

                if let Some(mut finished) = completed {
                    debug!(source = finished.session.source_uri(), "playback reached the end");
                    // Dropping our own handle detaches rather than aborts
                    finished.poller = None;
                    finished.retire().await;
                    break;
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActivePlayback>> {
        lock_shared(&self.active)
    }
}

impl<O: AudioOutput> Drop for PlayerController<O> {
    fn drop(&mut self) {
        if let Some(mut playback) = self.lock().take() {
            if let Some(poller) = playback.poller.take() {
                poller.abort();
            }
        }
    }
}
