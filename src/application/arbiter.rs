//! Audio session arbitration
//!
//! Record and playback routing are mutually exclusive on the shared audio
//! device. Both controllers go through one arbiter, and at most one
//! controller instance holds the session at a time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use super::ports::{AudioMode, AudioRouting};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Errors from acquiring the shared audio session
#[derive(Debug, Clone, Error)]
pub enum ArbiterError {
    #[error("Audio session is held by {holder}")]
    Busy { holder: AudioOwner },
}

/// A controller instance that may hold the audio session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioOwner {
    Recorder(u64),
    Player(u64),
}

impl AudioOwner {
    /// A fresh recorder identity
    pub fn recorder() -> Self {
        Self::Recorder(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// A fresh player identity
    pub fn player() -> Self {
        Self::Player(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Routing mode this owner needs
    pub const fn mode(&self) -> AudioMode {
        match self {
            Self::Recorder(_) => AudioMode::Record,
            Self::Player(_) => AudioMode::Playback,
        }
    }
}

impl fmt::Display for AudioOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recorder(id) => write!(f, "recorder#{}", id),
            Self::Player(id) => write!(f, "player#{}", id),
        }
    }
}

/// How routing went while acquiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// The device was reconfigured for the owner's mode
    Applied,
    /// The device was already in the owner's mode
    Unchanged,
    /// Reconfiguration failed; the session is held but the device may be
    /// routed for the other mode
    Degraded(String),
}

/// Current holder and the id of the lease it was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Holding {
    owner: AudioOwner,
    lease_id: u64,
}

#[derive(Debug, Default)]
struct ArbiterState {
    holding: Option<Holding>,
    next_lease_id: u64,
    mode: Option<AudioMode>,
}

/// Exclusive owner of audio routing, shared by recorder and player
pub struct AudioSessionArbiter {
    routing: Arc<dyn AudioRouting>,
    state: Mutex<ArbiterState>,
}

impl AudioSessionArbiter {
    pub fn new(routing: Arc<dyn AudioRouting>) -> Arc<Self> {
        Arc::new(Self {
            routing,
            state: Mutex::new(ArbiterState::default()),
        })
    }

    /// Current holder, if any
    pub fn holder(&self) -> Option<AudioOwner> {
        self.lock().holding.map(|h| h.owner)
    }

    /// Take the session for `owner`, reconfiguring routing if the mode changes.
    ///
    /// Fails with `Busy` if a different owner holds it. Re-acquiring by the
    /// current holder succeeds and supersedes its earlier lease: dropping the
    /// older lease afterwards no longer releases the session.
    pub async fn acquire(
        self: &Arc<Self>,
        owner: AudioOwner,
    ) -> Result<(AudioLease, RoutingOutcome), ArbiterError> {
        let mode = owner.mode();
        let (lease_id, needs_routing) = {
            let mut state = self.lock();
            if let Some(holding) = state.holding.filter(|h| h.owner != owner) {
                return Err(ArbiterError::Busy {
                    holder: holding.owner,
                });
            }
            state.next_lease_id += 1;
            let lease_id = state.next_lease_id;
            state.holding = Some(Holding { owner, lease_id });
            (lease_id, state.mode != Some(mode))
        };

        let lease = AudioLease {
            arbiter: Arc::clone(self),
            owner,
            lease_id,
        };

        if !needs_routing {
            return Ok((lease, RoutingOutcome::Unchanged));
        }

        let outcome = match self.routing.set_mode(mode).await {
            Ok(()) => {
                self.lock().mode = Some(mode);
                debug!(%owner, %mode, "audio routing applied");
                RoutingOutcome::Applied
            }
            Err(e) => {
                // Unknown mode: the next acquire reconfigures again
                self.lock().mode = None;
                warn!(%owner, %mode, error = %e, "audio routing failed, continuing degraded");
                RoutingOutcome::Degraded(e.to_string())
            }
        };

        Ok((lease, outcome))
    }

    fn release(&self, owner: AudioOwner, lease_id: u64) {
        let mut state = self.lock();
        if state.holding == Some(Holding { owner, lease_id }) {
            state.holding = None;
            debug!(%owner, lease_id, "audio session released");
        } else {
            debug!(%owner, lease_id, "superseded lease dropped");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ArbiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of holding the audio session; dropping it releases the session
pub struct AudioLease {
    arbiter: Arc<AudioSessionArbiter>,
    owner: AudioOwner,
    lease_id: u64,
}

impl AudioLease {
    pub fn owner(&self) -> AudioOwner {
        self.owner
    }
}

impl fmt::Debug for AudioLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioLease")
            .field("owner", &self.owner)
            .field("lease_id", &self.lease_id)
            .finish()
    }
}

impl Drop for AudioLease {
    fn drop(&mut self) {
        self.arbiter.release(self.owner, self.lease_id);
    }
}
