//! Database test utilities
//!
//! Every test gets its own tempfile-backed database with the real
//! schema applied, plus small seeding helpers for the snapshot tables.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;

/// Create temporary test database with the service schema applied.
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for the
/// duration of the test.
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_groovesync.db");
    let pool = groovesync::db::init_database_pool(&db_path).await?;
    Ok((temp_dir, pool))
}

pub async fn seed_user(pool: &SqlitePool, id: i64, name: &str) {
    sqlx::query("INSERT INTO users (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_artist(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query("INSERT INTO artists (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn seed_track(pool: &SqlitePool, title: &str, artist_id: i64) -> i64 {
    sqlx::query("INSERT INTO tracks (title, artist_id) VALUES (?, ?)")
        .bind(title)
        .bind(artist_id)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn seed_association(pool: &SqlitePool, user_id: i64, track_id: i64) {
    sqlx::query("INSERT INTO user_tracks (user_id, track_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(track_id)
        .execute(pool)
        .await
        .unwrap();
}

/// Number of stored track rows matching (title, artist name).
pub async fn count_tracks_for(pool: &SqlitePool, artist: &str, title: &str) -> i64 {
    sqlx::query(
        r#"
        SELECT COUNT(*) AS n
        FROM tracks t JOIN artists a ON a.id = t.artist_id
        WHERE t.title = ? AND a.name = ?
        "#,
    )
    .bind(title)
    .bind(artist)
    .fetch_one(pool)
    .await
    .unwrap()
    .get("n")
}

/// Number of user associations attached to a track row.
pub async fn association_count(pool: &SqlitePool, track_id: i64) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM user_tracks WHERE track_id = ?")
        .bind(track_id)
        .fetch_one(pool)
        .await
        .unwrap()
        .get("n")
}

/// Assert a table has the named column.
pub async fn assert_has_column(pool: &SqlitePool, table_name: &str, column_name: &str) {
    let query = format!("PRAGMA table_info({})", table_name);
    let rows = sqlx::query(&query).fetch_all(pool).await.unwrap();
    let found = rows
        .iter()
        .any(|row| row.get::<String, _>("name") == column_name);
    assert!(
        found,
        "Table '{}' should have column '{}', but it doesn't exist",
        table_name, column_name
    );
}
