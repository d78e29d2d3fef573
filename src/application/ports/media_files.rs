//! Media file probe port interface

use async_trait::async_trait;
use thiserror::Error;

/// Media file errors
#[derive(Debug, Clone, Error)]
pub enum MediaFileError {
    #[error("I/O error on {uri}: {message}")]
    Io { uri: String, message: String },
}

/// Port for checking and deleting media resources by URI
#[async_trait]
pub trait MediaFiles: Send + Sync {
    /// Size of the resource in bytes.
    ///
    /// # Returns
    /// `Ok(None)` if it does not exist, `Err` if the check itself failed
    async fn size_of(&self, uri: &str) -> Result<Option<u64>, MediaFileError>;

    /// Delete the resource; deleting something absent is not an error
    async fn remove(&self, uri: &str) -> Result<(), MediaFileError>;
}
