//! Media cache entry value objects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::duration::Duration;
use crate::domain::error::InvalidMediaTypeError;

/// Kind of media a cache entry replicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Voice,
}

impl MediaType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Voice => "voice",
        }
    }
}

impl FromStr for MediaType {
    type Err = InvalidMediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "voice" => Ok(Self::Voice),
            _ => Err(InvalidMediaTypeError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata about a local replica of a remote media item.
///
/// Field names follow the persisted format:
/// `{uri, localPath, timestamp, size, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Remote key this entry replicates
    pub uri: String,
    pub local_path: String,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Size of the local replica in bytes
    pub size: u64,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

impl CacheEntry {
    pub fn new(
        uri: impl Into<String>,
        local_path: impl Into<String>,
        timestamp: u64,
        size: u64,
        media_type: MediaType,
    ) -> Self {
        Self {
            uri: uri.into(),
            local_path: local_path.into(),
            timestamp,
            size,
            media_type,
        }
    }

    /// Age at `now_millis`; entries stamped in the future have age zero
    pub fn age_millis(&self, now_millis: u64) -> u64 {
        now_millis.saturating_sub(self.timestamp)
    }

    /// An entry is fresh while `now - createdAt <= max_age`
    pub fn is_fresh(&self, now_millis: u64, max_age: Duration) -> bool {
        self.age_millis(now_millis) <= max_age.as_millis()
    }
}

/// Aggregate view over the live cache entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_size: u64,
    pub item_count: usize,
    pub oldest_entry_timestamp: Option<u64>,
}

impl CacheStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CacheEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |stats, entry| Self {
            total_size: stats.total_size + entry.size,
            item_count: stats.item_count + 1,
            oldest_entry_timestamp: Some(
                stats
                    .oldest_entry_timestamp
                    .map_or(entry.timestamp, |oldest| oldest.min(entry.timestamp)),
            ),
        })
    }
}
