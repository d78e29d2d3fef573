//! Audio routing over cpal
//!
//! Desktop hosts have no record/playback route to switch; routing for a
//! mode succeeds when the host has a default device for it.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use crate::application::ports::{AudioMode, AudioRouting, RoutingError};

/// Checks the default cpal host for a device serving each mode
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalRouting;

impl CpalRouting {
    pub fn new() -> Self {
        Self
    }

    /// Name of the default device for `mode`
    fn default_device(mode: AudioMode) -> Result<String, RoutingError> {
        let host = cpal::default_host();
        let device = match mode {
            AudioMode::Record => host.default_input_device(),
            AudioMode::Playback => host.default_output_device(),
        }
        .ok_or(RoutingError::NoDevice(mode))?;

        device.name().map_err(|e| RoutingError::ConfigureFailed {
            mode,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AudioRouting for CpalRouting {
    async fn set_mode(&self, mode: AudioMode) -> Result<(), RoutingError> {
        let name = tokio::task::spawn_blocking(move || Self::default_device(mode))
            .await
            .map_err(|e| RoutingError::ConfigureFailed {
                mode,
                message: format!("Task join error: {}", e),
            })??;
        debug!(%mode, device = %name, "routed audio");
        Ok(())
    }
}

/// Routing for hosts without audio hardware; every mode is accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRouting;

#[async_trait]
impl AudioRouting for NoOpRouting {
    async fn set_mode(&self, _mode: AudioMode) -> Result<(), RoutingError> {
        Ok(())
    }
}
