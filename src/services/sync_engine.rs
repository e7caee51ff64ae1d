//! Friend and track diff-sync
//!
//! Computes set-diffs between stored state and the live remote state
//! and applies minimal add/remove mutations. Storage races are not
//! prevented here; the unique keys on users/artists absorb most of
//! them and the duplicate merger corrects the rest.

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

use crate::db::{self, tracks::TrackKey, MAX_ARTIST_NAME_LEN, MAX_TRACK_TITLE_LEN};

#[derive(Clone)]
pub struct SyncEngine {
    pool: SqlitePool,
}

impl SyncEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Diff-sync the user's friend edges against the remote list.
    ///
    /// Remote friends unknown to storage are created first (name from
    /// remote, nothing else synced). The diff itself is pure id-set
    /// membership; re-running with identical input is a no-op.
    pub async fn sync_friends(
        &self,
        user_id: i64,
        remote_friends: &HashMap<i64, String>,
    ) -> Result<()> {
        let remote_ids: Vec<i64> = remote_friends.keys().copied().collect();

        let known = db::users::known_user_ids(&self.pool, &remote_ids).await?;
        let to_create: Vec<(i64, String)> = remote_friends
            .iter()
            .filter(|(id, _)| !known.contains(id))
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        db::users::insert_users(&self.pool, &to_create).await?;

        tracing::info!(user_id, created = to_create.len(), "New users created from friend list");

        let stored: HashSet<i64> = db::users::friend_ids(&self.pool, user_id).await?;

        let to_add: Vec<i64> = remote_ids
            .iter()
            .filter(|id| !stored.contains(id))
            .copied()
            .collect();
        db::users::add_friends(&self.pool, user_id, &to_add).await?;

        let to_remove: Vec<i64> = stored
            .iter()
            .filter(|id| !remote_friends.contains_key(id))
            .copied()
            .collect();
        db::users::remove_friends(&self.pool, user_id, &to_remove).await?;

        tracing::info!(
            user_id,
            added = to_add.len(),
            removed = to_remove.len(),
            "Friend edges synced"
        );

        Ok(())
    }

    /// Diff-sync the user's track associations against the remote list,
    /// returning the keys of tracks inserted by this pass (the genre
    /// resolution batch).
    ///
    /// An empty remote list means "could not fetch", not "has none",
    /// and is a no-op.
    ///
    /// NOTE: only tracks whose artist was created by this same pass are
    /// considered for insertion. Tracks by pre-existing artists are
    /// linked only if some earlier pass already stored them. This
    /// mirrors the system's long-standing behavior and is kept
    /// deliberately; see DESIGN.md before changing it.
    pub async fn sync_tracks(
        &self,
        user_id: i64,
        remote_tracks: &[(String, String)],
    ) -> Result<Vec<TrackKey>> {
        if remote_tracks.is_empty() {
            tracing::debug!(user_id, "Empty track list, skipping sync");
            return Ok(Vec::new());
        }

        let artist_names: Vec<String> = remote_tracks
            .iter()
            .map(|(artist, _)| artist.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let existing = db::artists::existing_names(&self.pool, &artist_names).await?;
        let new_artists: HashSet<String> = artist_names
            .into_iter()
            .filter(|name| !existing.contains(name))
            .filter(|name| name.chars().count() <= MAX_ARTIST_NAME_LEN)
            .collect();

        let new_artist_list: Vec<String> = new_artists.iter().cloned().collect();
        db::artists::insert_artists(&self.pool, &new_artist_list).await?;

        tracing::info!(user_id, count = new_artists.len(), "New artists inserted");

        let candidate_keys: HashSet<TrackKey> = remote_tracks
            .iter()
            .filter(|(artist, _)| new_artists.contains(artist))
            .filter(|(_, title)| title.chars().count() <= MAX_TRACK_TITLE_LEN)
            .map(|(artist, title)| TrackKey::new(artist.clone(), title.clone()))
            .collect();

        let mut new_tracks = Vec::new();
        for key in candidate_keys {
            if !db::tracks::track_exists(&self.pool, &key).await? {
                new_tracks.push(key);
            }
        }
        db::tracks::insert_tracks(&self.pool, &new_tracks).await?;

        tracing::info!(user_id, count = new_tracks.len(), "New tracks inserted");

        // Membership diff runs over the full remote set, matching
        // whatever rows storage has for each pair.
        let remote_keys: Vec<TrackKey> = remote_tracks
            .iter()
            .map(|(artist, title)| TrackKey::new(artist.clone(), title.clone()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let matched = db::tracks::track_ids_matching(&self.pool, &remote_keys).await?;
        let current = db::tracks::user_track_ids(&self.pool, user_id).await?;

        let to_add: Vec<i64> = matched.difference(&current).copied().collect();
        db::tracks::add_user_tracks(&self.pool, user_id, &to_add).await?;

        let to_remove: Vec<i64> = current.difference(&matched).copied().collect();
        db::tracks::remove_user_tracks(&self.pool, user_id, &to_remove).await?;

        tracing::info!(
            user_id,
            added = to_add.len(),
            removed = to_remove.len(),
            "Track associations synced"
        );

        Ok(new_tracks)
    }
}
