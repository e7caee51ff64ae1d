//! Genre resolution through the provider fallback chain
//!
//! Providers are consulted in fixed priority order; the first non-empty
//! answer wins and the rest of the chain is never invoked. Each call is
//! individually wrapped in the provider's own rate-limited lock, so
//! providers throttle independently and can run back-to-back.

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{self, tracks::TrackKey, MAX_GENRE_NAME_LEN};
use crate::services::dedup_merger::DedupMerger;
use crate::services::providers::GenreProvider;
use crate::services::resource_lock::ResourceLocks;

/// Minimum interval between completed calls against one provider.
pub const PROVIDER_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Ordered fallback chain of genre providers.
pub struct GenreResolver {
    pool: SqlitePool,
    locks: Arc<ResourceLocks>,
    providers: Vec<Arc<dyn GenreProvider>>,
}

impl GenreResolver {
    pub fn new(
        pool: SqlitePool,
        locks: Arc<ResourceLocks>,
        providers: Vec<Arc<dyn GenreProvider>>,
    ) -> Self {
        Self {
            pool,
            locks,
            providers,
        }
    }

    /// Resolve a genre for the pair, or `None` when every provider
    /// comes up empty.
    ///
    /// Provider failures are logged and treated as "no result"; only
    /// lock-storage errors propagate.
    pub async fn resolve_genre(&self, artist: &str, title: &str) -> Result<Option<String>> {
        for provider in &self.providers {
            let result = self
                .locks
                .run(
                    provider.name(),
                    PROVIDER_MIN_INTERVAL,
                    provider.search(artist, title),
                )
                .await?;

            match result {
                Ok(Some(genre)) if !genre.is_empty() => {
                    tracing::info!(
                        artist,
                        title,
                        genre = %genre,
                        provider = provider.name(),
                        "Genre resolved"
                    );
                    return Ok(Some(genre));
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(
                        artist,
                        title,
                        provider = provider.name(),
                        error = %e,
                        "Provider lookup failed, trying next"
                    );
                }
            }
        }

        tracing::debug!(artist, title, "No provider returned a genre");
        Ok(None)
    }

    /// Resolve and assign genres for a batch of freshly inserted tracks.
    ///
    /// Per track: resolve through the chain, get-or-create the genre
    /// row, collapse any duplicate rows for the key, then stamp the
    /// genre onto the surviving row.
    pub async fn resolve_batch(&self, merger: &DedupMerger, keys: &[TrackKey]) -> Result<()> {
        for key in keys {
            let Some(genre) = self.resolve_genre(&key.artist, &key.title).await? else {
                continue;
            };

            if genre.chars().count() > MAX_GENRE_NAME_LEN {
                tracing::warn!(
                    artist = %key.artist,
                    title = %key.title,
                    genre = %genre,
                    "Resolved genre exceeds stored length, skipping"
                );
                continue;
            }

            let genre_id = db::genres::get_or_create_genre(&self.pool, &genre).await?;

            merger.merge_duplicates(key).await?;

            db::tracks::set_track_genre(&self.pool, key, genre_id).await?;
        }

        Ok(())
    }
}
