//! Per-user update status tracking
//!
//! A single flag per user in the shared `job_status` table,
//! last-write-wins, no history. Written by the orchestrator, read by
//! the UI through the status endpoint.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

const STATUS_IN_PROGRESS: &str = "in_progress";
const STATUS_FINISHED: &str = "finished";

/// Update status as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// No update was ever submitted for this user.
    Unknown,
    InProgress,
    Finished,
}

#[derive(Clone)]
pub struct ProgressTracker {
    pool: SqlitePool,
}

impl ProgressTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write the per-user status flag. Last write wins.
    pub async fn set_status(&self, user_id: i64, in_progress: bool) -> Result<()> {
        let status = if in_progress {
            STATUS_IN_PROGRESS
        } else {
            STATUS_FINISHED
        };

        sqlx::query(
            r#"
            INSERT INTO job_status (user_id, status) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(user_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id, status, "Update status written");
        Ok(())
    }

    /// Read the per-user status flag; `Unknown` if never written.
    pub async fn get_status(&self, user_id: i64) -> Result<UpdateStatus> {
        let row = sqlx::query("SELECT status FROM job_status WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let status = match row {
            Some(row) => match row.get::<String, _>("status").as_str() {
                STATUS_IN_PROGRESS => UpdateStatus::InProgress,
                STATUS_FINISHED => UpdateStatus::Finished,
                other => {
                    tracing::warn!(user_id, status = other, "Unrecognized status value");
                    UpdateStatus::Unknown
                }
            },
            None => UpdateStatus::Unknown,
        };

        Ok(status)
    }
}
