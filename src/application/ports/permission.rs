//! Microphone permission port interface

use async_trait::async_trait;

/// Outcome of a permission query or request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Never asked; a request may still be granted
    Undetermined,
}

impl PermissionStatus {
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Port for microphone access control
#[async_trait]
pub trait MicrophonePermission: Send + Sync {
    /// Current permission without prompting the user
    async fn status(&self) -> PermissionStatus;

    /// Ask the user for access.
    ///
    /// # Returns
    /// The status after the user answered
    async fn request(&self) -> PermissionStatus;
}
