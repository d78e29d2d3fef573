//! Media cache index
//!
//! Maps remote media keys to local replicas with a TTL. The index is
//! metadata only: a hit says a replica was stored, not that it is still
//! readable, so callers fall back to the remote source when opening fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::cache::{CacheEntry, CacheStats, MediaType};
use crate::domain::duration::Duration;

use super::ports::{Clock, KeyValueStorage, MediaFiles, StorageError};

/// Storage key the whole index is persisted under
pub const CACHE_STORAGE_KEY: &str = "media_cache_index";

type Index = BTreeMap<String, CacheEntry>;

/// Persisted remoteKey -> CacheEntry map with lazy TTL eviction
pub struct MediaCacheStore {
    storage: Arc<dyn KeyValueStorage>,
    files: Arc<dyn MediaFiles>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
    storage_key: String,
    /// Serializes read-modify-write cycles against storage
    guard: Mutex<()>,
}

impl MediaCacheStore {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        files: Arc<dyn MediaFiles>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            files,
            clock,
            max_age: Duration::default_cache_max_age(),
            storage_key: CACHE_STORAGE_KEY.to_string(),
            guard: Mutex::new(()),
        }
    }

    /// Override the entry TTL
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Persist under a different storage key
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Whether a fresh entry exists. An expired entry is evicted on check.
    pub async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.fresh_entry(key).await?.is_some())
    }

    /// Local path of a fresh entry
    pub async fn resolve(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.fresh_entry(key).await?.map(|entry| entry.local_path))
    }

    /// Fresh entry for `key`, evicting it if expired
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        self.fresh_entry(key).await
    }

    /// Insert or replace the entry for `key`, stamped now
    pub async fn put(
        &self,
        key: &str,
        local_path: &str,
        media_type: MediaType,
    ) -> Result<CacheEntry, StorageError> {
        let size = match self.files.size_of(local_path).await {
            Ok(Some(size)) => size,
            Ok(None) => {
                debug!(key, local_path, "caching replica that is not on disk yet");
                0
            }
            Err(e) => {
                warn!(key, error = %e, "could not size cached replica");
                0
            }
        };

        let entry = CacheEntry::new(key, local_path, self.clock.now_millis(), size, media_type);

        let _guard = self.guard.lock().await;
        let mut index = self.load().await?;
        index.insert(key.to_string(), entry.clone());
        self.persist(&index).await?;
        Ok(entry)
    }

    /// Delete one entry. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.guard.lock().await;
        let mut index = self.load().await?;
        let existed = index.remove(key).is_some();
        if existed {
            self.persist(&index).await?;
        }
        Ok(existed)
    }

    /// Drop the whole index
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.guard.lock().await;
        self.storage.remove(&self.storage_key).await
    }

    /// Evict every expired entry. Returns how many were removed.
    pub async fn prune(&self) -> Result<usize, StorageError> {
        let _guard = self.guard.lock().await;
        let mut index = self.load().await?;
        let evicted = self.evict_expired(&mut index);
        if evicted > 0 {
            self.persist(&index).await?;
            debug!(evicted, "pruned expired cache entries");
        }
        Ok(evicted)
    }

    /// Totals over the live entries (expired ones are pruned first)
    pub async fn stats(&self) -> Result<CacheStats, StorageError> {
        let _guard = self.guard.lock().await;
        let mut index = self.load().await?;
        if self.evict_expired(&mut index) > 0 {
            self.persist(&index).await?;
        }
        Ok(CacheStats::from_entries(index.values()))
    }

    /// Every live entry, ordered by key
    pub async fn entries(&self) -> Result<Vec<CacheEntry>, StorageError> {
        let _guard = self.guard.lock().await;
        let now = self.clock.now_millis();
        let index = self.load().await?;
        Ok(index
            .into_values()
            .filter(|entry| entry.is_fresh(now, self.max_age))
            .collect())
    }

    async fn fresh_entry(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        let _guard = self.guard.lock().await;
        let mut index = self.load().await?;
        let Some(entry) = index.get(key) else {
            return Ok(None);
        };

        if entry.is_fresh(self.clock.now_millis(), self.max_age) {
            return Ok(Some(entry.clone()));
        }

        debug!(key, "evicting expired cache entry");
        index.remove(key);
        self.persist(&index).await?;
        Ok(None)
    }

    fn evict_expired(&self, index: &mut Index) -> usize {
        let now = self.clock.now_millis();
        let before = index.len();
        index.retain(|_, entry| entry.is_fresh(now, self.max_age));
        before - index.len()
    }

    async fn load(&self) -> Result<Index, StorageError> {
        let Some(raw) = self.storage.get(&self.storage_key).await? else {
            return Ok(Index::new());
        };

        match serde_json::from_str::<Vec<(String, CacheEntry)>>(&raw) {
            Ok(pairs) => Ok(pairs.into_iter().collect()),
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "cache index unreadable, starting empty");
                Ok(Index::new())
            }
        }
    }

    async fn persist(&self, index: &Index) -> Result<(), StorageError> {
        let pairs: Vec<(&String, &CacheEntry)> = index.iter().collect();
        let raw = serde_json::to_string(&pairs).map_err(|e| StorageError::Serialize {
            key: self.storage_key.clone(),
            message: e.to_string(),
        })?;
        self.storage.set(&self.storage_key, &raw).await
    }
}
