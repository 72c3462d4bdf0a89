//! Tests for failover-cache, organized into:
//!
//! - **operations**: sentinels and pass-through for all six operations
//! - **classification**: which errors degrade and which propagate
//! - **scenarios**: end-to-end failover walkthroughs
//! - **increment**: batching of INCRBY and EXPIRE
//! - **config**: builder, options map and layer construction
//! - **events**: listener notifications
//! - **concurrency**: shared use across tasks

mod increment;
mod operations;
mod scenarios;

use failover_cache::{
    CacheStore, DegradeConfig, DegradingStore, IncrementOptions, MemoryStore, Operation,
    StoreError, WriteOptions,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const READONLY: &str = "READONLY You can't write against a read only slave.";
pub const LOADING: &str = "LOADING Redis is loading the dataset in memory";
pub const ELASTICACHE: &str = "A write operation was issued to an ELASTICACHE slave node.";

/// What an operation handed back, normalized so the six shapes can be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Returned {
    Read(Option<String>),
    Write(bool),
    Delete(bool),
    DeleteMatched(Option<u64>),
    FetchMulti(Option<HashMap<String, String>>),
    Increment(Option<i64>),
}

/// The documented degrade sentinel for `operation`.
pub fn sentinel(operation: Operation) -> Returned {
    match operation {
        Operation::Read => Returned::Read(None),
        Operation::Write => Returned::Write(false),
        Operation::Delete => Returned::Delete(false),
        Operation::DeleteMatched => Returned::DeleteMatched(None),
        Operation::FetchMulti => Returned::FetchMulti(None),
        Operation::Increment => Returned::Increment(None),
    }
}

/// Calls `operation` on `store` with fixed arguments.
pub async fn call<S>(store: &S, operation: Operation) -> Result<Returned, StoreError>
where
    S: CacheStore<Value = String, Error = StoreError>,
{
    Ok(match operation {
        Operation::Read => Returned::Read(store.read("k").await?),
        Operation::Write => Returned::Write(
            store
                .write("k", "v".to_string(), WriteOptions::default())
                .await?,
        ),
        Operation::Delete => Returned::Delete(store.delete("k").await?),
        Operation::DeleteMatched => Returned::DeleteMatched(store.delete_matched("prefix:*").await?),
        Operation::FetchMulti => Returned::FetchMulti(store.fetch_multi(&["k", "j"]).await?),
        Operation::Increment => Returned::Increment(
            store
                .increment("counter", 1, IncrementOptions::expires_in(Duration::from_secs(60)))
                .await?,
        ),
    })
}

/// A backend that fails every call with `error`, behind a decorator built from `config`.
pub fn failing_store(
    error: StoreError,
    config: DegradeConfig,
) -> (Arc<MemoryStore>, DegradingStore<Arc<MemoryStore>>) {
    let backend = Arc::new(MemoryStore::new());
    backend.fail_with(error);
    let store = DegradingStore::new(Arc::clone(&backend), config);
    (backend, store)
}

/// Every transport-level failure the in-memory client can report.
pub fn transport_errors() -> Vec<StoreError> {
    vec![
        StoreError::Connection("Connection refused (os error 111)".to_string()),
        StoreError::Timeout(Duration::from_millis(250)),
        StoreError::Protocol("invalid first byte".to_string()),
        StoreError::Authentication("WRONGPASS invalid username-password pair".to_string()),
    ]
}
