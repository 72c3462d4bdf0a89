//! End-to-end failover walkthroughs.

use super::{failing_store, LOADING};
use failover_cache::{
    CacheStore, DegradeConfig, DegradingStore, Failover, IncrementOptions, MemoryStore,
    StoreError, WriteOptions,
};
use std::sync::Arc;

#[tokio::test]
async fn test_loading_read_looks_like_a_miss() {
    let (_, store) = failing_store(StoreError::command(LOADING), DegradeConfig::default());
    assert_eq!(store.read("k").await, Ok(None));
}

#[tokio::test]
async fn test_custom_failure_write_returns_false() {
    let config = DegradeConfig::builder()
        .ignored_command_errors(["Custom Failure"])
        .build_config();
    let (_, store) = failing_store(StoreError::command("Custom Failure"), config);
    assert_eq!(
        store
            .write("k", "v".to_string(), WriteOptions::default())
            .await,
        Ok(false)
    );
}

#[tokio::test]
async fn test_unexpected_server_panic_on_delete_raises() {
    let (_, store) = failing_store(
        StoreError::command("Unexpected Server Panic"),
        DegradeConfig::default(),
    );
    let err = store.delete("k").await.unwrap_err();
    assert!(err.is_command());
    assert_eq!(err.to_string(), "Unexpected Server Panic");
}

#[tokio::test]
async fn test_raise_errors_delete_matched_raises() {
    let config = DegradeConfig::builder().raise_errors(true).build_config();
    let (_, store) = failing_store(StoreError::command(LOADING), config);
    assert_eq!(
        store.delete_matched("prefix:*").await,
        Err(StoreError::command(LOADING))
    );
}

#[tokio::test]
async fn test_full_failover_cycle() {
    let backend = Arc::new(MemoryStore::new());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    // Primary healthy.
    assert_eq!(
        store
            .write("page:/", "<html>".to_string(), WriteOptions::default())
            .await,
        Ok(true)
    );
    assert_eq!(
        store
            .increment("views", 1, IncrementOptions::default())
            .await,
        Ok(Some(1))
    );

    // Demoted: writes are skipped, reads are served.
    backend.set_failover(Failover::ReadOnlyReplica);
    assert_eq!(
        store
            .write("page:/", "<html v2>".to_string(), WriteOptions::default())
            .await,
        Ok(false)
    );
    assert_eq!(
        store
            .increment("views", 1, IncrementOptions::default())
            .await,
        Ok(None)
    );
    assert_eq!(store.read("page:/").await, Ok(Some("<html>".to_string())));

    // Replacement primary promoted but still loading: everything is a miss.
    backend.set_failover(Failover::Loading);
    assert_eq!(store.read("page:/").await, Ok(None));
    assert_eq!(store.fetch_multi(&["page:/", "views"]).await, Ok(None));

    // Network partition during the switch: this one is real.
    backend.fail_with(StoreError::Connection("no route to host".to_string()));
    assert_eq!(
        store.read("page:/").await,
        Err(StoreError::Connection("no route to host".to_string()))
    );

    // Failover complete.
    backend.heal();
    assert_eq!(
        store
            .increment("views", 1, IncrementOptions::default())
            .await,
        Ok(Some(2))
    );
    assert_eq!(store.read("page:/").await, Ok(Some("<html>".to_string())));
}
