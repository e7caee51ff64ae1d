//! Track and user-track-association persistence
//!
//! Tracks are identified by (title, artist) with uniqueness as an
//! intent rather than a constraint; every query here therefore works
//! against *all* rows matching a key, and the duplicate merger relies
//! on that to observe and collapse forks.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

/// A (artist, title) pair identifying a track, both lower-cased upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub artist: String,
    pub title: String,
}

impl TrackKey {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

/// A stored track row with its association count, as seen by the merger.
#[derive(Debug, Clone)]
pub struct TrackRow {
    pub id: i64,
    pub association_count: i64,
}

/// Whether any track row matches the key.
pub async fn track_exists(pool: &SqlitePool, key: &TrackKey) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT t.id
        FROM tracks t
        JOIN artists a ON a.id = t.artist_id
        WHERE t.title = ? AND a.name = ?
        LIMIT 1
        "#,
    )
    .bind(&key.title)
    .bind(&key.artist)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Bulk-insert track rows, resolving the artist id by name.
pub async fn insert_tracks(pool: &SqlitePool, keys: &[TrackKey]) -> Result<()> {
    for key in keys {
        sqlx::query(
            r#"
            INSERT INTO tracks (title, artist_id)
            SELECT ?, id FROM artists WHERE name = ?
            "#,
        )
        .bind(&key.title)
        .bind(&key.artist)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Ids of all stored track rows matching any of the keys.
///
/// Duplicate rows for one key all match, mirroring the membership
/// semantics before a merger pass has run.
pub async fn track_ids_matching(pool: &SqlitePool, keys: &[TrackKey]) -> Result<HashSet<i64>> {
    let mut ids = HashSet::new();
    for key in keys {
        let rows = sqlx::query(
            r#"
            SELECT t.id
            FROM tracks t
            JOIN artists a ON a.id = t.artist_id
            WHERE t.title = ? AND a.name = ?
            "#,
        )
        .bind(&key.title)
        .bind(&key.artist)
        .fetch_all(pool)
        .await?;

        ids.extend(rows.iter().map(|row| row.get::<i64, _>("id")));
    }
    Ok(ids)
}

/// Track ids currently associated with a user.
pub async fn user_track_ids(pool: &SqlitePool, user_id: i64) -> Result<HashSet<i64>> {
    let rows = sqlx::query("SELECT track_id FROM user_tracks WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("track_id")).collect())
}

/// Add user-track associations.
pub async fn add_user_tracks(pool: &SqlitePool, user_id: i64, track_ids: &[i64]) -> Result<()> {
    for track_id in track_ids {
        sqlx::query("INSERT OR IGNORE INTO user_tracks (user_id, track_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(track_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Remove user-track associations.
pub async fn remove_user_tracks(pool: &SqlitePool, user_id: i64, track_ids: &[i64]) -> Result<()> {
    for track_id in track_ids {
        sqlx::query("DELETE FROM user_tracks WHERE user_id = ? AND track_id = ?")
            .bind(user_id)
            .bind(track_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// All rows matching a key, ranked by association count descending.
///
/// Id ascending as a tiebreak so concurrent merger passes pick the same
/// canonical row.
pub async fn rows_for_key(pool: &SqlitePool, key: &TrackKey) -> Result<Vec<TrackRow>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, COUNT(ut.user_id) AS association_count
        FROM tracks t
        JOIN artists a ON a.id = t.artist_id
        LEFT JOIN user_tracks ut ON ut.track_id = t.id
        WHERE t.title = ? AND a.name = ?
        GROUP BY t.id
        ORDER BY association_count DESC, t.id ASC
        "#,
    )
    .bind(&key.title)
    .bind(&key.artist)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| TrackRow {
            id: row.get("id"),
            association_count: row.get("association_count"),
        })
        .collect())
}

/// Re-parent all associations of `from_track` onto `to_track`.
///
/// Users already associated with `to_track` keep their existing edge;
/// the leftover rows on `from_track` are dropped afterwards.
pub async fn reparent_associations(
    pool: &SqlitePool,
    from_track: i64,
    to_track: i64,
) -> Result<()> {
    sqlx::query("UPDATE OR IGNORE user_tracks SET track_id = ? WHERE track_id = ?")
        .bind(to_track)
        .bind(from_track)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM user_tracks WHERE track_id = ?")
        .bind(from_track)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a track row.
pub async fn delete_track(pool: &SqlitePool, track_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tracks WHERE id = ?")
        .bind(track_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Assign a genre to every row matching the key.
///
/// Runs after the merger, so normally exactly one row is affected.
pub async fn set_track_genre(pool: &SqlitePool, key: &TrackKey, genre_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tracks SET genre_id = ?
        WHERE id IN (
            SELECT t.id FROM tracks t
            JOIN artists a ON a.id = t.artist_id
            WHERE t.title = ? AND a.name = ?
        )
        "#,
    )
    .bind(genre_id)
    .bind(&key.title)
    .bind(&key.artist)
    .execute(pool)
    .await?;

    Ok(())
}
