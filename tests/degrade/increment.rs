//! Increment batching: the decorator must not change what reaches the client.

use failover_cache::{
    CacheStore, Command, DegradingStore, Failover, IncrementOptions, Issued, MemoryStore,
};
use std::sync::Arc;
use std::time::Duration;

fn five_minutes() -> IncrementOptions {
    IncrementOptions::expires_in(Duration::from_secs(5 * 60))
}

#[tokio::test]
async fn test_increment_with_ttl_returns_only_the_new_value() {
    let store = DegradingStore::with_defaults(MemoryStore::new());
    assert_eq!(store.increment("testing", 1, five_minutes()).await, Ok(Some(1)));
    assert_eq!(store.increment("testing", 5, five_minutes()).await, Ok(Some(6)));
}

#[tokio::test]
async fn test_increment_without_ttl_issues_only_incrby() {
    let backend = Arc::new(MemoryStore::with_journal());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    assert_eq!(
        store
            .increment("testing", 1, IncrementOptions::default())
            .await,
        Ok(Some(1))
    );
    assert_eq!(
        backend.journal(),
        vec![Issued::Command(Command::new("INCRBY", ["testing", "1"]))]
    );
}

#[tokio::test]
async fn test_increment_with_ttl_issues_one_atomic_batch() {
    let backend = Arc::new(MemoryStore::with_journal());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    store.increment("testing", 1, five_minutes()).await.unwrap();
    assert_eq!(
        backend.journal(),
        vec![Issued::Batch(vec![
            Command::new("INCRBY", ["testing", "1"]),
            Command::new("EXPIRE", ["testing", "300"]),
        ])]
    );
}

#[tokio::test]
async fn test_zero_ttl_is_treated_as_no_ttl() {
    let backend = Arc::new(MemoryStore::with_journal());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    store
        .increment("testing", 2, IncrementOptions::expires_in(Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(
        backend.journal(),
        vec![Issued::Command(Command::new("INCRBY", ["testing", "2"]))]
    );
}

#[tokio::test]
async fn test_rejected_batch_applies_nothing() {
    let backend = Arc::new(MemoryStore::with_journal());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    store.increment("testing", 1, five_minutes()).await.unwrap();
    backend.clear_journal();

    backend.set_failover(Failover::ReadOnlyReplica);
    assert_eq!(store.increment("testing", 1, five_minutes()).await, Ok(None));
    assert!(backend.journal().is_empty());

    backend.heal();
    assert_eq!(store.increment("testing", 1, five_minutes()).await, Ok(Some(2)));
}
