//! Duplicate track collapse
//!
//! Two workers syncing different users can insert the same (artist,
//! title) pair concurrently, forking the track into multiple rows.
//! This pass collapses the fork: the row with the most user
//! associations becomes canonical, every other row's associations are
//! re-parented onto it, and the losers are deleted.

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{self, tracks::TrackKey};
use crate::services::resource_lock::ResourceLocks;

pub struct DedupMerger {
    pool: SqlitePool,
    locks: Arc<ResourceLocks>,
}

impl DedupMerger {
    pub fn new(pool: SqlitePool, locks: Arc<ResourceLocks>) -> Self {
        Self { pool, locks }
    }

    /// Collapse duplicate rows for the key, if any.
    ///
    /// Guarded by a per-key lock so a second worker attempting the same
    /// merge waits and then observes either zero duplicates (already
    /// merged) or picks the same canonical row. A rerun finds a single
    /// row and is a no-op.
    pub async fn merge_duplicates(&self, key: &TrackKey) -> Result<()> {
        self.locks
            .run(&merge_lock_name(key), Duration::ZERO, self.merge_inner(key))
            .await?
    }

    async fn merge_inner(&self, key: &TrackKey) -> Result<()> {
        let rows = db::tracks::rows_for_key(&self.pool, key).await?;
        if rows.len() <= 1 {
            return Ok(());
        }

        let canonical = &rows[0];
        tracing::info!(
            artist = %key.artist,
            title = %key.title,
            duplicates = rows.len() - 1,
            canonical_id = canonical.id,
            "Merging duplicate track rows"
        );

        for duplicate in &rows[1..] {
            db::tracks::reparent_associations(&self.pool, duplicate.id, canonical.id).await?;
            db::tracks::delete_track(&self.pool, duplicate.id).await?;
        }

        Ok(())
    }
}

/// Lock name for one key's merge pass.
///
/// The artist length prefix keeps names containing ':' from aliasing
/// each other's locks.
fn merge_lock_name(key: &TrackKey) -> String {
    format!("merge:{}:{}:{}", key.artist.len(), key.artist, key.title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colons_in_names_do_not_alias_lock_keys() {
        let left = merge_lock_name(&TrackKey::new("a:b", "c"));
        let right = merge_lock_name(&TrackKey::new("a", "b:c"));
        assert_ne!(left, right);
    }

    #[test]
    fn same_key_always_maps_to_the_same_lock() {
        let key = TrackKey::new("mogwai", "auto rock");
        assert_eq!(merge_lock_name(&key), merge_lock_name(&key));
    }
}
