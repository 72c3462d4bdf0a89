//! Sentinels and pass-through for every operation.

use super::{call, failing_store, sentinel, Returned, ELASTICACHE, LOADING, READONLY};
use failover_cache::{
    CacheStore, Command, DegradeConfig, DegradingStore, IncrementOptions, Issued, MemoryStore,
    Operation, StoreError, WriteOptions,
};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_every_operation_degrades_on_each_default_signature() {
    for message in [READONLY, LOADING, ELASTICACHE] {
        let (_, store) = failing_store(StoreError::command(message), DegradeConfig::default());
        for operation in Operation::ALL {
            let returned = call(&store, operation).await;
            assert_eq!(
                returned,
                Ok(sentinel(operation)),
                "{operation} with {message:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_delete_matched_sentinel_differs_from_zero_matches() {
    let healthy = DegradingStore::with_defaults(MemoryStore::new());
    assert_eq!(healthy.delete_matched("prefix:*").await, Ok(Some(0)));

    let (_, loading) = failing_store(StoreError::command(LOADING), DegradeConfig::default());
    assert_eq!(loading.delete_matched("prefix:*").await, Ok(None));
}

#[tokio::test]
async fn test_fetch_multi_sentinel_differs_from_empty_map() {
    let healthy = DegradingStore::with_defaults(MemoryStore::new());
    assert_eq!(healthy.fetch_multi(&["a", "b"]).await, Ok(Some(HashMap::new())));

    let (_, loading) = failing_store(StoreError::command(LOADING), DegradeConfig::default());
    assert_eq!(loading.fetch_multi(&["a", "b"]).await, Ok(None));
}

#[tokio::test]
async fn test_success_values_pass_through_unchanged() {
    let backend = Arc::new(MemoryStore::new());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    assert_eq!(
        call(&store, Operation::Write).await,
        Ok(Returned::Write(true))
    );
    assert_eq!(
        call(&store, Operation::Read).await,
        Ok(Returned::Read(Some("v".to_string())))
    );
    assert_eq!(
        call(&store, Operation::FetchMulti).await,
        Ok(Returned::FetchMulti(Some(HashMap::from([(
            "k".to_string(),
            "v".to_string()
        )]))))
    );
    assert_eq!(
        call(&store, Operation::Increment).await,
        Ok(Returned::Increment(Some(1)))
    );
    assert_eq!(
        call(&store, Operation::Delete).await,
        Ok(Returned::Delete(true))
    );
    assert_eq!(
        call(&store, Operation::Delete).await,
        Ok(Returned::Delete(false))
    );

    store
        .write("prefix:a", "1".to_string(), WriteOptions::default())
        .await
        .unwrap();
    store
        .write("prefix:b", "2".to_string(), WriteOptions::default())
        .await
        .unwrap();
    assert_eq!(
        call(&store, Operation::DeleteMatched).await,
        Ok(Returned::DeleteMatched(Some(2)))
    );
}

#[tokio::test]
async fn test_unless_exist_false_is_not_a_degradation() {
    let store = DegradingStore::with_defaults(MemoryStore::new());
    let nx = WriteOptions::default().unless_exist();
    assert_eq!(store.write("k", "a".to_string(), nx.clone()).await, Ok(true));
    assert_eq!(store.write("k", "b".to_string(), nx).await, Ok(false));
    assert_eq!(store.read("k").await, Ok(Some("a".to_string())));
}

#[tokio::test]
async fn test_arguments_reach_the_client_unchanged() {
    let backend = Arc::new(MemoryStore::with_journal());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    store
        .write(
            "session:1",
            "alice".to_string(),
            WriteOptions::expires_in(std::time::Duration::from_secs(30)).unless_exist(),
        )
        .await
        .unwrap();
    store.read("session:1").await.unwrap();
    store.fetch_multi(&["session:1", "session:2"]).await.unwrap();
    store
        .increment("visits", 3, IncrementOptions::default())
        .await
        .unwrap();
    store.delete("session:1").await.unwrap();

    assert_eq!(
        backend.journal(),
        vec![
            Issued::Command(Command::new(
                "SET",
                ["session:1", "alice", "EX", "30", "NX"]
            )),
            Issued::Command(Command::new("GET", ["session:1"])),
            Issued::Command(Command::new("MGET", ["session:1", "session:2"])),
            Issued::Command(Command::new("INCRBY", ["visits", "3"])),
            Issued::Command(Command::new("DEL", ["session:1"])),
        ]
    );
}

#[tokio::test]
async fn test_loading_node_degrades_without_applying_anything() {
    let backend = Arc::new(MemoryStore::with_journal());
    let store = DegradingStore::with_defaults(Arc::clone(&backend));

    store
        .write("k", "v".to_string(), WriteOptions::default())
        .await
        .unwrap();
    backend.clear_journal();
    backend.set_failover(failover_cache::Failover::Loading);

    for operation in Operation::ALL {
        assert_eq!(call(&store, operation).await, Ok(sentinel(operation)));
    }

    // Rejected before anything was applied.
    assert!(backend.journal().is_empty());
    backend.heal();
    assert_eq!(store.read("k").await, Ok(Some("v".to_string())));
}
