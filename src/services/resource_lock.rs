//! Named cross-worker locks with built-in call pacing
//!
//! Every external resource (each genre provider, the social-graph
//! session, each in-flight duplicate merge) is guarded by a named row
//! in the shared `resource_locks` table. A lock couples two things into
//! one gate: mutual exclusion across all worker processes sharing the
//! database, and a minimum interval between completed calls against the
//! resource. The pacing sleep happens *while the lock is held*, so the
//! whole pool can never exceed `1 / min_interval` calls per second
//! against one resource, regardless of process count.

use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// How often a blocked worker re-attempts a claim.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Lease after which a lock held by a crashed worker may be taken over.
const HOLDER_LEASE: Duration = Duration::from_secs(60);

/// Resource lock errors (all storage-level; pacing itself cannot fail)
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Registry of named locks backed by the shared database.
#[derive(Debug, Clone)]
pub struct ResourceLocks {
    pool: SqlitePool,
    /// Identifies this worker in the `holder` column.
    holder_id: String,
}

impl ResourceLocks {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            holder_id: Uuid::new_v4().to_string(),
        }
    }

    /// Run `fut` while holding the named lock, pacing against the
    /// resource's last completed call.
    ///
    /// The wrapped future is driven only after (a) the lock is claimed
    /// and (b) at least `min_interval` has elapsed since the previous
    /// holder released. On release the completion timestamp is stamped
    /// whether the wrapped call succeeded or failed: the call was
    /// attempted, so the throttle window applies either way.
    pub async fn run<O, Fut>(
        &self,
        name: &str,
        min_interval: Duration,
        fut: Fut,
    ) -> Result<O, LockError>
    where
        Fut: Future<Output = O>,
    {
        self.acquire(name).await?;

        if !min_interval.is_zero() {
            let last = self.last_call_at(name).await?;
            let elapsed = unix_millis().saturating_sub(last);
            let interval_ms = min_interval.as_millis() as u64;
            if elapsed < interval_ms {
                let wait = Duration::from_millis(interval_ms - elapsed);
                tracing::debug!(resource = name, wait = ?wait, "Rate limiting: waiting");
                tokio::time::sleep(wait).await;
            }
        }

        let output = fut.await;

        self.release(name).await?;

        Ok(output)
    }

    /// Block until the named lock row is claimed by this worker.
    async fn acquire(&self, name: &str) -> Result<(), LockError> {
        sqlx::query(
            r#"
            INSERT INTO resource_locks (name, holder, acquired_at, last_call_at)
            VALUES (?, NULL, NULL, 0)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .execute(&self.pool)
        .await?;

        loop {
            let now = unix_millis();
            let lease_cutoff = now.saturating_sub(HOLDER_LEASE.as_millis() as u64);

            let claimed = sqlx::query(
                r#"
                UPDATE resource_locks
                SET holder = ?, acquired_at = ?
                WHERE name = ? AND (holder IS NULL OR acquired_at < ?)
                "#,
            )
            .bind(&self.holder_id)
            .bind(now as i64)
            .bind(name)
            .bind(lease_cutoff as i64)
            .execute(&self.pool)
            .await?;

            if claimed.rows_affected() == 1 {
                tracing::debug!(resource = name, "Lock acquired");
                return Ok(());
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Release the lock and stamp the completed-call timestamp.
    async fn release(&self, name: &str) -> Result<(), LockError> {
        sqlx::query(
            r#"
            UPDATE resource_locks
            SET holder = NULL, acquired_at = NULL, last_call_at = ?
            WHERE name = ? AND holder = ?
            "#,
        )
        .bind(unix_millis() as i64)
        .bind(name)
        .bind(&self.holder_id)
        .execute(&self.pool)
        .await?;

        tracing::debug!(resource = name, "Lock released");
        Ok(())
    }

    async fn last_call_at(&self, name: &str) -> Result<u64, LockError> {
        let row = sqlx::query("SELECT last_call_at FROM resource_locks WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|row| row.get::<i64, _>("last_call_at") as u64)
            .unwrap_or(0))
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tempfile-backed: a pooled in-memory database is per-connection.
    async fn test_locks() -> (tempfile::TempDir, ResourceLocks) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("locks.db");
        let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        sqlx::query(
            r#"
            CREATE TABLE resource_locks (
                name TEXT PRIMARY KEY,
                holder TEXT,
                acquired_at INTEGER,
                last_call_at INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        (dir, ResourceLocks::new(pool))
    }

    #[tokio::test]
    async fn sequential_calls_are_paced() {
        let (_dir, locks) = test_locks().await;
        let interval = Duration::from_millis(100);

        let start = std::time::Instant::now();
        for _ in 0..3 {
            locks.run("test-resource", interval, async {}).await.unwrap();
        }

        // Three calls leave two full pacing gaps between them.
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn first_call_is_not_delayed() {
        let (_dir, locks) = test_locks().await;

        let start = std::time::Instant::now();
        locks
            .run("fresh-resource", Duration::from_secs(1), async {})
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn failed_call_still_stamps_the_window() {
        let (_dir, locks) = test_locks().await;
        let interval = Duration::from_millis(100);

        let failed: Result<(), &str> = locks
            .run("flaky-resource", interval, async { Err("boom") })
            .await
            .unwrap();
        assert!(failed.is_err());

        // The failed attempt must have released the lock and started a
        // new throttle window.
        let start = std::time::Instant::now();
        locks
            .run("flaky-resource", interval, async {})
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn distinct_resources_do_not_wait_on_each_other() {
        let (_dir, locks) = test_locks().await;
        let interval = Duration::from_millis(200);

        locks.run("resource-a", interval, async {}).await.unwrap();

        let start = std::time::Instant::now();
        locks.run("resource-b", interval, async {}).await.unwrap();

        // resource-b has its own cooldown; resource-a's stamp is irrelevant.
        assert!(start.elapsed() < Duration::from_millis(150));
    }
}
