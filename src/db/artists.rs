//! Artist persistence
//!
//! Artists are created lazily the first time a track by that name is
//! observed during a sync pass. `artists.name` is UNIQUE, so racing
//! inserts from concurrent workers collapse onto one row.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use super::placeholders;

/// Filter a candidate name set down to names already present in storage.
pub async fn existing_names(pool: &SqlitePool, names: &[String]) -> Result<HashSet<String>> {
    if names.is_empty() {
        return Ok(HashSet::new());
    }

    let sql = format!(
        "SELECT name FROM artists WHERE name IN ({})",
        placeholders(names.len())
    );
    let mut query = sqlx::query(&sql);
    for name in names {
        query = query.bind(name);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(|row| row.get("name")).collect())
}

/// Bulk-insert artist rows, skipping names already present.
pub async fn insert_artists(pool: &SqlitePool, names: &[String]) -> Result<()> {
    for name in names {
        sqlx::query("INSERT OR IGNORE INTO artists (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }
    Ok(())
}
