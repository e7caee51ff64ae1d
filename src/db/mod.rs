//! Database access for groovesync
//!
//! A single shared SQLite file holds both the music snapshot (users,
//! artists, tracks, genres) and the cross-worker coordination tables
//! (resource_locks, job_status). Every worker process opens the same
//! file, which is what makes the named locks and the job status flags
//! visible across the whole pool.

pub mod artists;
pub mod genres;
pub mod tracks;
pub mod users;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Maximum stored artist name length, in characters.
pub const MAX_ARTIST_NAME_LEN: usize = 64;
/// Maximum stored track title length, in characters.
pub const MAX_TRACK_TITLE_LEN: usize = 64;
/// Maximum stored genre/subgenre name length, in characters.
pub const MAX_GENRE_NAME_LEN: usize = 32;

/// Initialize database connection pool
///
/// Connects to the shared groovesync database, creating it if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize groovesync tables
///
/// Creates snapshot and coordination tables if they don't exist.
///
/// NOTE: `tracks` deliberately carries no UNIQUE(title, artist_id)
/// constraint. Concurrent sync workers can insert the same pair twice;
/// the duplicate merger collapses those rows after genre resolution.
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS friendships (
            user_id INTEGER NOT NULL,
            friend_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, friend_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subgenres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist_id INTEGER NOT NULL REFERENCES artists(id),
            genre_id INTEGER REFERENCES genres(id),
            subgenre_id INTEGER REFERENCES subgenres(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_tracks (
            user_id INTEGER NOT NULL,
            track_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, track_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_status (
            user_id INTEGER PRIMARY KEY,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resource_locks (
            name TEXT PRIMARY KEY,
            holder TEXT,
            acquired_at INTEGER,
            last_call_at INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

/// Build a "?,?,?" placeholder list for an IN clause.
pub(crate) fn placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}
