//! Genre tag persistence
//!
//! Tag rows are created lazily from resolver results. `genres.name` is
//! UNIQUE; get-or-create is the only write path.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// Get or create a genre row by name, returning its id.
pub async fn get_or_create_genre(pool: &SqlitePool, name: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO genres (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    let row = sqlx::query("SELECT id FROM genres WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;

    Ok(row.get("id"))
}
