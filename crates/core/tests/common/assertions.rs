//! Custom assertion helpers for bucket contents.

use rpipe_core::PipeEngine;

/// Assert that the bucket at `(id, state)` holds exactly `expected`, in any order.
pub async fn assert_bucket_eq(engine: &PipeEngine, id: &str, state: &str, expected: &[&str]) {
    let mut members = engine
        .get_members(id, state)
        .await
        .unwrap_or_else(|e| panic!("failed to read {id}/{state}: {e}"));
    members.sort();

    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();

    assert_eq!(members, expected, "bucket {id}/{state}");
}

/// Assert that the bucket at `(id, state)` does not exist or is empty.
pub async fn assert_bucket_empty(engine: &PipeEngine, id: &str, state: &str) {
    assert_bucket_eq(engine, id, state, &[]).await;
}
