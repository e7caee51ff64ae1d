//! ProgressTracker and schema validation tests

mod helpers;

use groovesync::services::{ProgressTracker, UpdateStatus};
use helpers::{assert_has_column, create_test_db};

#[tokio::test]
async fn status_lifecycle() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let tracker = ProgressTracker::new(pool.clone());

    assert_eq!(tracker.get_status(42).await.unwrap(), UpdateStatus::Unknown);

    tracker.set_status(42, true).await.unwrap();
    assert_eq!(
        tracker.get_status(42).await.unwrap(),
        UpdateStatus::InProgress
    );

    tracker.set_status(42, false).await.unwrap();
    assert_eq!(tracker.get_status(42).await.unwrap(), UpdateStatus::Finished);

    // Re-submission overwrites: last write wins.
    tracker.set_status(42, true).await.unwrap();
    assert_eq!(
        tracker.get_status(42).await.unwrap(),
        UpdateStatus::InProgress
    );
}

#[tokio::test]
async fn statuses_are_per_user() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let tracker = ProgressTracker::new(pool.clone());

    tracker.set_status(1, true).await.unwrap();

    assert_eq!(tracker.get_status(1).await.unwrap(), UpdateStatus::InProgress);
    assert_eq!(tracker.get_status(2).await.unwrap(), UpdateStatus::Unknown);
}

#[tokio::test]
async fn schema_has_expected_columns() {
    let (_dir, pool) = create_test_db().await.unwrap();

    assert_has_column(&pool, "users", "name").await;
    assert_has_column(&pool, "friendships", "friend_id").await;
    assert_has_column(&pool, "tracks", "genre_id").await;
    assert_has_column(&pool, "tracks", "subgenre_id").await;
    assert_has_column(&pool, "resource_locks", "last_call_at").await;
    assert_has_column(&pool, "job_status", "status").await;
}
