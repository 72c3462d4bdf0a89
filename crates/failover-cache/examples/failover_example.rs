//! Failover walkthrough.
//!
//! Run with: cargo run --example failover_example -p failover-cache --features tracing
//!
//! This example demonstrates:
//! - A healthy primary serving every operation
//! - A demoted replica rejecting writes, degraded to `false` / `None`
//! - A node loading its dataset, degraded to cache misses
//! - A network failure, which always propagates
//! - `raise_errors` turning degradation off

use failover_cache::{
    CacheStore, DegradeConfig, DegradingStore, Failover, IncrementOptions, MemoryStore,
    StoreError, WriteOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    println!("Failover Cache Example");
    println!("======================\n");

    let degraded = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&degraded);

    let backend = Arc::new(MemoryStore::new());
    let config = DegradeConfig::builder()
        .name("sessions")
        .on_degraded(move |operation, message| {
            d.fetch_add(1, Ordering::SeqCst);
            println!("  [degraded] {operation}: {message}");
        })
        .build_config();
    let store = DegradingStore::new(Arc::clone(&backend), config);

    // Example 1: healthy primary
    println!("Example 1: healthy primary");
    store
        .write("session:1", "alice".to_string(), WriteOptions::default())
        .await?;
    let hits = store
        .increment("hits", 1, IncrementOptions::expires_in(Duration::from_secs(300)))
        .await?;
    println!("  read session:1 -> {:?}", store.read("session:1").await?);
    println!("  hits -> {:?}\n", hits);

    // Example 2: the node was demoted
    println!("Example 2: demoted to read-only replica");
    backend.set_failover(Failover::ReadOnlyReplica);
    let written = store
        .write("session:2", "bob".to_string(), WriteOptions::default())
        .await?;
    println!("  write session:2 -> {written}");
    println!("  read session:1 -> {:?}", store.read("session:1").await?);
    println!(
        "  delete_matched session:* -> {:?}\n",
        store.delete_matched("session:*").await?
    );

    // Example 3: promoted node still loading
    println!("Example 3: promoted node still loading its dataset");
    backend.set_failover(Failover::Loading);
    println!("  read session:1 -> {:?}", store.read("session:1").await?);
    println!(
        "  fetch_multi -> {:?}\n",
        store.fetch_multi(&["session:1", "hits"]).await?
    );

    // Example 4: connectivity failures are never degraded
    println!("Example 4: connection lost");
    backend.fail_with(StoreError::Connection("connection reset by peer".to_string()));
    match store.read("session:1").await {
        Ok(value) => println!("  unexpected success: {value:?}"),
        Err(e) => println!("  propagated: {e}"),
    }
    backend.heal();
    println!();

    // Example 5: raise_errors
    println!("Example 5: raise_errors = true");
    let strict = DegradingStore::new(
        Arc::clone(&backend),
        DegradeConfig::builder().name("strict").raise_errors(true).build_config(),
    );
    backend.set_failover(Failover::ReadOnlyReplica);
    match strict.delete("session:1").await {
        Ok(deleted) => println!("  unexpected success: {deleted}"),
        Err(e) => println!("  propagated: {e}"),
    }

    println!("\nDegraded calls: {}", degraded.load(Ordering::SeqCst));
    Ok(())
}
