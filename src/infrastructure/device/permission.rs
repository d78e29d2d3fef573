//! Microphone permission adapters

use async_trait::async_trait;
use cpal::traits::HostTrait;

use crate::application::ports::{MicrophonePermission, PermissionStatus};

/// Treats an available input device as permission to record.
///
/// Desktop audio servers do not prompt; access fails at the device level,
/// so a missing default input is reported as a refusal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevicePermission;

impl DevicePermission {
    pub fn new() -> Self {
        Self
    }

    async fn probe() -> PermissionStatus {
        let has_input =
            tokio::task::spawn_blocking(|| cpal::default_host().default_input_device().is_some())
                .await
                .unwrap_or(false);
        if has_input {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}

#[async_trait]
impl MicrophonePermission for DevicePermission {
    async fn status(&self) -> PermissionStatus {
        Self::probe().await
    }

    async fn request(&self) -> PermissionStatus {
        Self::probe().await
    }
}

/// A fixed answer, for hosts where access is decided elsewhere
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub PermissionStatus);

#[async_trait]
impl MicrophonePermission for StaticPermission {
    async fn status(&self) -> PermissionStatus {
        self.0
    }

    async fn request(&self) -> PermissionStatus {
        match self.0 {
            PermissionStatus::Undetermined => PermissionStatus::Granted,
            decided => decided,
        }
    }
}
