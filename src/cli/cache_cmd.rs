//! Cache command handler

use thiserror::Error;

use crate::application::ports::StorageError;
use crate::application::MediaCacheStore;
use crate::domain::recording::human_readable_bytes;

use super::args::CacheAction;
use super::presenter::Presenter;

/// Failures surfaced by `cache` subcommands
#[derive(Debug, Error)]
pub enum CacheCommandError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Not cached: {0}")]
    NotCached(String),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Handle cache subcommand
pub async fn handle_cache_command(
    action: CacheAction,
    cache: &MediaCacheStore,
    presenter: &Presenter,
) -> Result<(), CacheCommandError> {
    match action {
        CacheAction::Stats { json } => {
            let stats = cache.stats().await?;
            if json {
                presenter.output(&serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            presenter.key_value("items", &stats.item_count.to_string());
            presenter.key_value("total_size", &human_readable_bytes(stats.total_size));
            let oldest = stats
                .oldest_entry_timestamp
                .map_or_else(|| "(none)".to_string(), |ts| ts.to_string());
            presenter.key_value("oldest_entry", &oldest);
        }
        CacheAction::List => {
            for entry in cache.entries().await? {
                presenter.output(&format!(
                    "{} -> {} ({}, {})",
                    entry.uri,
                    entry.local_path,
                    entry.media_type,
                    human_readable_bytes(entry.size)
                ));
            }
        }
        CacheAction::Put {
            key,
            path,
            media_type,
        } => {
            let entry = cache.put(&key, &path, media_type.into()).await?;
            presenter.success(&format!(
                "Cached {} ({})",
                entry.uri,
                human_readable_bytes(entry.size)
            ));
        }
        CacheAction::Resolve { key } => match cache.resolve(&key).await? {
            Some(path) => presenter.output(&path),
            None => return Err(CacheCommandError::NotCached(key)),
        },
        CacheAction::Remove { key } => {
            if cache.remove(&key).await? {
                presenter.success(&format!("Removed {}", key));
            } else {
                presenter.warn(&format!("Not cached: {}", key));
            }
        }
        CacheAction::Prune => {
            let evicted = cache.prune().await?;
            presenter.success(&format!("Pruned {} expired entries", evicted));
        }
        CacheAction::Clear => {
            cache.clear().await?;
            presenter.success("Cache index cleared");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::MediaTypeArg;
    use crate::domain::duration::Duration;
    use crate::infrastructure::{LocalMediaFiles, ManualClock, MemoryStorage};
    use std::sync::Arc;

    fn cache(clock: Arc<ManualClock>) -> MediaCacheStore {
        MediaCacheStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(LocalMediaFiles::new()),
            clock,
        )
    }

    #[tokio::test]
    async fn put_then_resolve() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = cache(clock);
        let presenter = Presenter::new();

        handle_cache_command(
            CacheAction::Put {
                key: "https://cdn/a.flac".into(),
                path: "/tmp/a.flac".into(),
                media_type: MediaTypeArg::Voice,
            },
            &cache,
            &presenter,
        )
        .await
        .unwrap();

        assert_eq!(
            cache.resolve("https://cdn/a.flac").await.unwrap().as_deref(),
            Some("/tmp/a.flac")
        );
    }

    #[tokio::test]
    async fn resolve_of_expired_entry_is_not_cached() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(clock.clone());
        let presenter = Presenter::new();
        cache
            .put("k", "/tmp/k", crate::domain::cache::MediaType::Image)
            .await
            .unwrap();

        clock.advance(Duration::from_days(8).as_millis());

        let err = handle_cache_command(CacheAction::Resolve { key: "k".into() }, &cache, &presenter)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheCommandError::NotCached(key) if key == "k"));
    }

    #[tokio::test]
    async fn remove_missing_key_is_not_an_error() {
        let cache = cache(Arc::new(ManualClock::new(0)));
        let presenter = Presenter::new();
        handle_cache_command(CacheAction::Remove { key: "nope".into() }, &cache, &presenter)
            .await
            .unwrap();
    }
}
