//! Whole-user update job chain
//!
//! One submitted update fans out into independently running sub-jobs:
//! profile fetch, friend diff-sync, a per-user track sync for the user
//! and every friend (no ordering between them), a genre-resolution
//! batch over the tracks inserted by the pass, and a finalize step that
//! runs only after the join barrier — never on a fixed delay.
//!
//! There is no cancellation and no rollback: a dispatched job runs to
//! completion or fails, and a failed job is recovered by idempotent
//! re-submission.

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::db::{self, tracks::TrackKey};
use crate::services::dedup_merger::DedupMerger;
use crate::services::genre_resolver::GenreResolver;
use crate::services::progress::ProgressTracker;
use crate::services::social_client::SocialGraphClient;
use crate::services::sync_engine::SyncEngine;

pub struct UpdateOrchestrator {
    pool: SqlitePool,
    social: Arc<SocialGraphClient>,
    sync: SyncEngine,
    resolver: Arc<GenreResolver>,
    merger: Arc<DedupMerger>,
    progress: ProgressTracker,
}

impl UpdateOrchestrator {
    pub fn new(
        pool: SqlitePool,
        social: Arc<SocialGraphClient>,
        resolver: Arc<GenreResolver>,
        merger: Arc<DedupMerger>,
    ) -> Self {
        Self {
            sync: SyncEngine::new(pool.clone()),
            progress: ProgressTracker::new(pool.clone()),
            pool,
            social,
            resolver,
            merger,
        }
    }

    /// Submit a whole-user update, fire-and-forget.
    ///
    /// The only externally invoked entry point of the pipeline. A
    /// failed run is logged and abandoned; its partial writes stand
    /// until the next submission for the same user overwrites them.
    pub fn submit(self: &Arc<Self>, user_id: i64) {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run_user_update(user_id).await {
                tracing::error!(user_id, error = %e, "User update failed");
            }
        });
    }

    /// Run the full update chain for one user.
    pub async fn run_user_update(&self, user_id: i64) -> Result<()> {
        self.progress.set_status(user_id, true).await?;

        let username = self.social.fetch_username(user_id).await?;
        let (_, created) = db::users::get_or_create_user(&self.pool, user_id, &username).await?;
        tracing::info!(user_id, name = %username, created, "User profile synced");

        let friends = self.social.fetch_friends(user_id).await?;
        self.sync.sync_friends(user_id, &friends).await?;

        // Fan-out: one track sync per user, no ordering between them.
        let mut join_set = JoinSet::new();
        for uid in std::iter::once(user_id).chain(friends.keys().copied()) {
            let social = Arc::clone(&self.social);
            let sync = self.sync.clone();
            join_set.spawn(async move {
                let tracks = social.fetch_tracks(uid).await?;
                sync.sync_tracks(uid, &tracks).await
            });
        }

        // Fan-in: the join barrier. A failed sub-job is logged and its
        // user skipped; the rest of the pass proceeds.
        let mut new_tracks: HashSet<TrackKey> = HashSet::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(keys)) => new_tracks.extend(keys),
                Ok(Err(e)) => {
                    tracing::warn!(user_id, error = %e, "Track sync sub-job failed, skipping")
                }
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Track sync sub-job panicked, skipping")
                }
            }
        }

        let batch: Vec<TrackKey> = new_tracks.into_iter().collect();
        tracing::info!(user_id, count = batch.len(), "Resolving genres for new tracks");
        self.resolver.resolve_batch(&self.merger, &batch).await?;

        self.progress.set_status(user_id, false).await?;
        tracing::info!(user_id, "User update finished");

        Ok(())
    }
}
