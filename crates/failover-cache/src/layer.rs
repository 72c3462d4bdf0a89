//! Tower layer for the degrading store.

use crate::config::{DegradeConfig, DegradeConfigBuilder};
use crate::DegradingStore;
use std::sync::Arc;
use tower::layer::Layer;

/// A Tower layer that wraps a cache client in a [`DegradingStore`].
///
/// The configuration is built once and shared by every store the layer wraps.
///
/// [`DegradingStore`] is a [`CacheStore`](crate::CacheStore), not a
/// `tower::Service`, so this layer stacks only with other layers over cache
/// clients. It does not compose with request/response middleware such as
/// timeouts or retries. Most callers use it as a factory:
///
/// ```
/// use failover_cache::{DegradeLayer, MemoryStore};
/// use tower::Layer;
///
/// let layer = DegradeLayer::builder().name("sessions").build();
/// let primary = layer.layer(MemoryStore::new());
/// let replica = layer.layer(MemoryStore::new());
/// assert!(std::ptr::eq(primary.config(), replica.config()));
/// ```
///
/// `ServiceBuilder` works as long as every layer in it wraps a cache client:
///
/// ```
/// use failover_cache::{DegradeLayer, MemoryStore};
/// use tower::ServiceBuilder;
///
/// let store = ServiceBuilder::new()
///     .layer(DegradeLayer::builder().name("sessions").build())
///     .service(MemoryStore::new());
/// assert_eq!(store.config().name(), "sessions");
/// ```
#[derive(Clone, Debug)]
pub struct DegradeLayer {
    config: Arc<DegradeConfig>,
}

impl DegradeLayer {
    /// Creates a layer from the given configuration.
    pub fn new(config: DegradeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a degrade layer.
    pub fn builder() -> DegradeConfigBuilder {
        DegradeConfigBuilder::new()
    }

    /// The shared configuration.
    pub fn config(&self) -> &DegradeConfig {
        &self.config
    }
}

impl Default for DegradeLayer {
    fn default() -> Self {
        Self::new(DegradeConfig::default())
    }
}

impl<S> Layer<S> for DegradeLayer {
    type Service = DegradingStore<S>;

    fn layer(&self, store: S) -> Self::Service {
        DegradingStore::new(store, Arc::clone(&self.config))
    }
}
