//! Local filesystem media probe

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::{MediaFileError, MediaFiles};

/// Resolves URIs as local paths, with or without a `file://` scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMediaFiles;

impl LocalMediaFiles {
    pub fn new() -> Self {
        Self
    }

    fn path_of(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

#[async_trait]
impl MediaFiles for LocalMediaFiles {
    async fn size_of(&self, uri: &str) -> Result<Option<u64>, MediaFileError> {
        match fs::metadata(Self::path_of(uri)).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MediaFileError::Io {
                uri: uri.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn remove(&self, uri: &str) -> Result<(), MediaFileError> {
        match fs::remove_file(Self::path_of(uri)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaFileError::Io {
                uri: uri.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
