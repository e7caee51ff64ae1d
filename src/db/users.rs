//! User and friendship persistence
//!
//! Users are keyed by their external social id; the row is created on
//! first sync and never deleted. Friendship edges are directed: only
//! the syncing user's edge set is maintained.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use super::placeholders;

/// User record
#[derive(Debug, Clone)]
pub struct User {
    /// External social id (stable, unique)
    pub id: i64,
    pub name: String,
}

/// Get or create a user row by external id.
///
/// Returns the row plus whether it was created by this call. Safe under
/// concurrent writers: the insert ignores a row created by a racing
/// worker and the follow-up select observes whichever insert won.
pub async fn get_or_create_user(pool: &SqlitePool, id: i64, name: &str) -> Result<(User, bool)> {
    if let Some(user) = load_user(pool, id).await? {
        return Ok((user, false));
    }

    sqlx::query("INSERT OR IGNORE INTO users (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;

    let user = load_user(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} missing after insert", id))?;

    Ok((user, true))
}

/// Load a user by external id.
pub async fn load_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, name FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| User {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// Filter a candidate id set down to the ids already present in storage.
pub async fn known_user_ids(pool: &SqlitePool, ids: &[i64]) -> Result<HashSet<i64>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let sql = format!(
        "SELECT id FROM users WHERE id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(|row| row.get("id")).collect())
}

/// Bulk-insert user rows, skipping ids already present.
pub async fn insert_users(pool: &SqlitePool, users: &[(i64, String)]) -> Result<()> {
    for (id, name) in users {
        sqlx::query("INSERT OR IGNORE INTO users (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Stored friend id set of a user.
pub async fn friend_ids(pool: &SqlitePool, user_id: i64) -> Result<HashSet<i64>> {
    let rows = sqlx::query("SELECT friend_id FROM friendships WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("friend_id")).collect())
}

/// Add friendship edges from `user_id` to each id in `friend_ids`.
pub async fn add_friends(pool: &SqlitePool, user_id: i64, friend_ids: &[i64]) -> Result<()> {
    for friend_id in friend_ids {
        sqlx::query("INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(friend_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Remove friendship edges from `user_id` to each id in `friend_ids`.
pub async fn remove_friends(pool: &SqlitePool, user_id: i64, friend_ids: &[i64]) -> Result<()> {
    if friend_ids.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "DELETE FROM friendships WHERE user_id = ? AND friend_id IN ({})",
        placeholders(friend_ids.len())
    );
    let mut query = sqlx::query(&sql).bind(user_id);
    for friend_id in friend_ids {
        query = query.bind(friend_id);
    }
    query.execute(pool).await?;

    Ok(())
}
