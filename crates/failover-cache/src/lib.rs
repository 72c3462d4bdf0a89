//! Degrade-on-failover decorator for key-value cache clients.
//!
//! When a replicated cache cluster fails over, the nodes it demotes or
//! promotes reject commands for a short while with well-known messages:
//! replicas refuse writes, a node that is still loading its dataset refuses
//! everything. Those rejections say nothing about the health of the data, and
//! for a cache the right reaction is usually to behave as if the operation
//! had not happened.
//!
//! [`DegradingStore`] wraps any [`CacheStore`] and does exactly that. Every
//! call is delegated unchanged; a failure is classified as follows:
//!
//! 1. Errors that are not server command errors (connection loss, timeouts,
//!    protocol and authentication failures) are returned as-is.
//! 2. With `raise_errors` enabled, every error is returned as-is.
//! 3. Command errors whose message is not in the ignored set are returned as-is.
//! 4. Everything left degrades to the operation's sentinel:
//!
//! | Operation | Sentinel |
//! |---|---|
//! | `read` | `None`, a miss |
//! | `write` | `false` |
//! | `delete` | `false` |
//! | `delete_matched` | `None`, not `Some(0)` |
//! | `fetch_multi` | `None`, not an empty map |
//! | `increment` | `None` |
//!
//! There is no retry, no backoff and no state carried between calls.
//!
//! # Examples
//!
//! ```
//! use failover_cache::{CacheStore, DegradingStore, Failover, MemoryStore, WriteOptions};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), failover_cache::StoreError> {
//! let backend = Arc::new(MemoryStore::new());
//! let store = DegradingStore::with_defaults(Arc::clone(&backend));
//!
//! assert!(store.write("greeting", "hello".to_string(), WriteOptions::default()).await?);
//!
//! // The node we're talking to was demoted mid-flight.
//! backend.set_failover(Failover::ReadOnlyReplica);
//! assert!(!store.write("greeting", "bye".to_string(), WriteOptions::default()).await?);
//! assert_eq!(store.read("greeting").await?.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```
//! use failover_cache::{DegradingStore, MemoryStore, DEFAULT_IGNORED_COMMAND_ERRORS};
//!
//! let config = DegradingStore::<MemoryStore>::builder()
//!     .name("sessions")
//!     // Replaces the defaults; chain them in to keep them.
//!     .ignored_command_errors(
//!         DEFAULT_IGNORED_COMMAND_ERRORS
//!             .into_iter()
//!             .chain(["CLUSTERDOWN The cluster is down"]),
//!     )
//!     .raise_errors(false)
//!     .on_degraded(|operation, message| eprintln!("{operation} degraded: {message}"))
//!     .build_config();
//!
//! let store = DegradingStore::new(MemoryStore::new(), config);
//! assert_eq!(store.config().ignored_command_errors().len(), 4);
//! ```
//!
//! Message matching is exact. A server release that rewords one of these
//! messages silently turns the corresponding degradation into an error.
//!
//! # Features
//!
//! - `tracing`: debug records for each disposition
//! - `metrics`: `cache_degrade_calls_total{store, operation, result}`
//! - `redis`: `RedisStore`, a client over a multiplexed Redis connection

mod classify;
mod config;
mod error;
mod events;
mod layer;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;
mod store;

pub use classify::{
    Classifier, CommandError, Disposition, IgnoredCommandErrors, Outcome, PropagateReason,
    DEFAULT_IGNORED_COMMAND_ERRORS,
};
pub use config::{DegradeConfig, DegradeConfigBuilder, StoreOptions};
pub use error::StoreError;
pub use events::{DegradeEvent, DegradeListener, Listeners, Operation};
pub use layer::DegradeLayer;
pub use memory::{Command, Failover, Issued, MemoryStore};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use store::{CacheStore, IncrementOptions, WriteOptions};

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A [`CacheStore`] that degrades known failover errors to sentinels.
///
/// See the [crate-level documentation](crate) for the classification rules.
pub struct DegradingStore<S> {
    inner: S,
    config: Arc<DegradeConfig>,
}

impl<S> DegradingStore<S> {
    /// Wraps `inner`. No I/O happens here.
    pub fn new(inner: S, config: impl Into<Arc<DegradeConfig>>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "cache_degrade_calls_total",
                "Total number of cache calls by outcome (success, degraded, propagated)"
            );
        });

        Self {
            inner,
            config: config.into(),
        }
    }

    /// Wraps `inner` with the default ignored set and `raise_errors` off.
    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, DegradeConfig::default())
    }

    /// Builds the wrapped client and the decorator from one options map.
    ///
    /// `connect` receives the client's share of the options.
    pub fn from_options<C, F>(options: StoreOptions<C>, connect: F) -> Self
    where
        F: FnOnce(C) -> S,
    {
        let (client, builder) = options.into_parts();
        Self::new(connect(client), builder.build_config())
    }

    /// Creates a new configuration builder.
    pub fn builder() -> DegradeConfigBuilder {
        DegradeConfigBuilder::new()
    }

    /// The configuration this store classifies with.
    pub fn config(&self) -> &DegradeConfig {
        &self.config
    }

    /// The wrapped client.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwraps the client.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: CacheStore> DegradingStore<S> {
    /// Classifies a finished call, substituting `sentinel` when it degrades.
    ///
    /// Every operation funnels through here; events, logs and metrics are
    /// emitted once the outcome is known. Use [`Classifier::decide`] to
    /// resolve a result without recording it.
    pub(crate) fn classify<T>(
        &self,
        operation: Operation,
        result: Result<T, S::Error>,
        sentinel: T,
    ) -> Outcome<T, S::Error> {
        let outcome = match result {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(store = %self.config.name, %operation, "call succeeded");

                self.emit(|| DegradeEvent::Success {
                    store_name: self.config.name.clone(),
                    operation,
                    timestamp: Instant::now(),
                });
                Outcome::Success(value)
            }
            Err(error) => {
                let disposition = self.config.classifier.classify(&error);
                let outcome = Outcome::from_error(error, &disposition, sentinel);
                match disposition {
                    Disposition::Degrade(message) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            store = %self.config.name,
                            %operation,
                            error = %message,
                            "ignored command error, returning sentinel"
                        );

                        self.emit(|| DegradeEvent::Degraded {
                            store_name: self.config.name.clone(),
                            operation,
                            timestamp: Instant::now(),
                            message,
                        });
                    }
                    Disposition::Propagate(reason) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            store = %self.config.name,
                            %operation,
                            %reason,
                            "propagating error"
                        );

                        self.emit(|| DegradeEvent::Propagated {
                            store_name: self.config.name.clone(),
                            operation,
                            timestamp: Instant::now(),
                            reason,
                        });
                    }
                }
                outcome
            }
        };

        #[cfg(feature = "metrics")]
        counter!(
            "cache_degrade_calls_total",
            "store" => self.config.name.clone(),
            "operation" => operation.as_str(),
            "result" => outcome.as_str()
        )
        .increment(1);

        outcome
    }

    fn guard<T>(
        &self,
        operation: Operation,
        result: Result<T, S::Error>,
        sentinel: T,
    ) -> Result<T, S::Error> {
        self.classify(operation, result, sentinel).into_result()
    }

    fn emit(&self, event: impl FnOnce() -> DegradeEvent) {
        if !self.config.event_listeners.is_empty() {
            self.config.event_listeners.emit(&event());
        }
    }
}

impl<S: Clone> Clone for DegradingStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for DegradingStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradingStore")
            .field("inner", &self.inner)
            .field("name", &self.config.name)
            .field("raise_errors", &self.config.raise_errors())
            .finish()
    }
}

impl<S: CacheStore> CacheStore for DegradingStore<S> {
    type Value = S::Value;
    type Error = S::Error;

    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Self::Value>, Self::Error>> {
        Box::pin(async move {
            let result = self.inner.read(key).await;
            self.guard(Operation::Read, result, None)
        })
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        value: Self::Value,
        options: WriteOptions,
    ) -> BoxFuture<'a, Result<bool, Self::Error>> {
        Box::pin(async move {
            let result = self.inner.write(key, value, options).await;
            self.guard(Operation::Write, result, false)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, Self::Error>> {
        Box::pin(async move {
            let result = self.inner.delete(key).await;
            self.guard(Operation::Delete, result, false)
        })
    }

    fn delete_matched<'a>(
        &'a self,
        pattern: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, Self::Error>> {
        Box::pin(async move {
            let result = self.inner.delete_matched(pattern).await;
            self.guard(Operation::DeleteMatched, result, None)
        })
    }

    fn fetch_multi<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Option<HashMap<String, Self::Value>>, Self::Error>> {
        Box::pin(async move {
            let result = self.inner.fetch_multi(keys).await;
            self.guard(Operation::FetchMulti, result, None)
        })
    }

    fn increment<'a>(
        &'a self,
        key: &'a str,
        amount: i64,
        options: IncrementOptions,
    ) -> BoxFuture<'a, Result<Option<i64>, Self::Error>> {
        Box::pin(async move {
            let result = self.inner.increment(key, amount, options).await;
            self.guard(Operation::Increment, result, None)
        })
    }
}
