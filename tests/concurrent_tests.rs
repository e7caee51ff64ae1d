//! Cross-task coordination tests for the resource locks

mod helpers;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use groovesync::services::ResourceLocks;
use helpers::create_test_db;

#[tokio::test]
async fn same_name_serializes_critical_sections() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let locks = Arc::new(ResourceLocks::new(pool));

    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let mut join_set = JoinSet::new();
    for _ in 0..4 {
        let locks = Arc::clone(&locks);
        let inside = Arc::clone(&inside);
        let overlaps = Arc::clone(&overlaps);
        join_set.spawn(async move {
            locks
                .run("shared-resource", Duration::ZERO, async {
                    if inside.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    inside.store(false, Ordering::SeqCst);
                })
                .await
                .unwrap();
        });
    }

    while let Some(joined) = join_set.join_next().await {
        joined.unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pacing_applies_across_tasks() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let locks = Arc::new(ResourceLocks::new(pool));
    let interval = Duration::from_millis(100);

    let start = std::time::Instant::now();

    let mut join_set = JoinSet::new();
    for _ in 0..3 {
        let locks = Arc::clone(&locks);
        join_set.spawn(async move {
            locks.run("paced-resource", interval, async {}).await.unwrap();
        });
    }
    while let Some(joined) = join_set.join_next().await {
        joined.unwrap();
    }

    // Three completed calls from competing tasks still leave two full
    // pacing gaps between them.
    assert!(start.elapsed() >= Duration::from_millis(200));
}
