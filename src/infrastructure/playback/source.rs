//! Media source loading
//!
//! Playback decodes from memory. Remote URIs are downloaded whole with
//! reqwest; anything else is a local path, optionally `file://` prefixed.

use std::path::Path;

use tracing::debug;

use crate::application::ports::PlaybackError;

/// Fetches media bytes by URI
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    client: reqwest::Client,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Whether `uri` refers to something that must be downloaded
    pub fn is_remote(uri: &str) -> bool {
        uri.starts_with("http://") || uri.starts_with("https://")
    }

    /// Read the whole resource
    pub async fn load(&self, uri: &str) -> Result<Vec<u8>, PlaybackError> {
        if Self::is_remote(uri) {
            self.download(uri).await
        } else {
            let path = uri.strip_prefix("file://").unwrap_or(uri);
            tokio::fs::read(Path::new(path))
                .await
                .map_err(|e| PlaybackError::SourceUnavailable(format!("{}: {}", path, e)))
        }
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, PlaybackError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| PlaybackError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlaybackError::SourceUnavailable(format!(
                "HTTP {} for {}",
                status, uri
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlaybackError::SourceUnavailable(e.to_string()))?;

        debug!(uri, bytes = bytes.len(), "downloaded media");
        Ok(bytes.to_vec())
    }
}
