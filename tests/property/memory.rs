//! Property tests for the decorator in front of the in-memory client.
//!
//! Invariants tested:
//! - Increments through a healthy store sum exactly
//! - No write reaches a replica, and every write degrades to `false`
//! - Pattern deletes remove exactly the keys the glob matches

use failover_cache::{
    CacheStore, DegradingStore, Failover, IncrementOptions, MemoryStore, WriteOptions,
};
use futures::executor::block_on;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a healthy store adds up every increment
    #[test]
    fn increments_sum(amounts in prop::collection::vec(-1_000i64..1_000, 1..40)) {
        let store = DegradingStore::with_defaults(MemoryStore::new());
        let mut last = None;
        for amount in &amounts {
            last = block_on(store.increment("n", *amount, IncrementOptions::default()))
                .unwrap();
        }
        prop_assert_eq!(last, Some(amounts.iter().sum::<i64>()));
    }

    /// Property: writes against a replica degrade and leave no trace
    #[test]
    fn replica_writes_degrade(
        keys in prop::collection::vec("[a-z]{1,8}", 1..20),
        elasticache in any::<bool>(),
    ) {
        let backend = Arc::new(MemoryStore::new());
        backend.set_failover(if elasticache {
            Failover::ElastiCacheReplica
        } else {
            Failover::ReadOnlyReplica
        });
        let store = DegradingStore::with_defaults(Arc::clone(&backend));

        for key in &keys {
            let written = block_on(store.write(key, key.clone(), WriteOptions::default()));
            prop_assert_eq!(written, Ok(false));
        }
        prop_assert!(backend.is_empty());
    }

    /// Property: `prefix:*` removes exactly the prefixed keys
    #[test]
    fn delete_matched_counts_prefixed_keys(
        prefixed in prop::collection::hash_set("[a-z]{1,6}", 0..10),
        other in prop::collection::hash_set("[a-z]{1,6}", 0..10),
    ) {
        let backend = Arc::new(MemoryStore::new());
        let store = DegradingStore::with_defaults(Arc::clone(&backend));
        for key in &prefixed {
            block_on(store.write(&format!("p:{key}"), key.clone(), WriteOptions::default()))
                .unwrap();
        }
        for key in &other {
            block_on(store.write(&format!("q:{key}"), key.clone(), WriteOptions::default()))
                .unwrap();
        }

        let removed = block_on(store.delete_matched("p:*")).unwrap();
        prop_assert_eq!(removed, Some(prefixed.len() as u64));
        prop_assert_eq!(backend.len(), other.len());
    }
}
