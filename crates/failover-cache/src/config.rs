//! Configuration for the degrading store.

use crate::classify::{Classifier, IgnoredCommandErrors, PropagateReason};
use crate::events::{DegradeEvent, Listeners, Operation};
use serde::{Deserialize, Serialize};

/// Configuration for [`DegradingStore`](crate::DegradingStore).
///
/// Immutable once built. A layer shares one instance across every store it
/// wraps.
#[derive(Debug, Clone)]
pub struct DegradeConfig {
    pub(crate) name: String,
    pub(crate) classifier: Classifier,
    pub(crate) event_listeners: Listeners,
}

impl DegradeConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> DegradeConfigBuilder {
        DegradeConfigBuilder::new()
    }

    /// The store name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The classification policy.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The active ignored set.
    pub fn ignored_command_errors(&self) -> &IgnoredCommandErrors {
        self.classifier.ignored_command_errors()
    }

    /// Whether every error propagates.
    pub fn raise_errors(&self) -> bool {
        self.classifier.raise_errors()
    }
}

impl Default for DegradeConfig {
    fn default() -> Self {
        DegradeConfigBuilder::new().build_config()
    }
}

/// Builder for configuring and constructing a degrading store.
pub struct DegradeConfigBuilder {
    name: String,
    ignored: IgnoredCommandErrors,
    raise_errors: bool,
    event_listeners: Listeners,
}

impl DegradeConfigBuilder {
    /// Creates a new builder with the default ignored set and `raise_errors` off.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            ignored: IgnoredCommandErrors::default(),
            raise_errors: false,
            event_listeners: Listeners::new(),
        }
    }

    /// Sets the name of this store instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the ignored command error messages.
    ///
    /// The defaults are discarded, not merged: pass
    /// [`DEFAULT_IGNORED_COMMAND_ERRORS`](crate::DEFAULT_IGNORED_COMMAND_ERRORS)
    /// along with your own messages to keep them.
    pub fn ignored_command_errors<I, M>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.ignored = IgnoredCommandErrors::new(messages);
        self
    }

    /// When `true`, every error propagates and nothing degrades.
    ///
    /// Default: `false`
    pub fn raise_errors(mut self, raise_errors: bool) -> Self {
        self.raise_errors = raise_errors;
        self
    }

    /// Adds a listener for every event.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&DegradeEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Registers a callback for calls that degraded, with the matched message.
    pub fn on_degraded<F>(mut self, f: F) -> Self
    where
        F: Fn(Operation, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &DegradeEvent| {
            if let DegradeEvent::Degraded {
                operation, message, ..
            } = event
            {
                f(*operation, message);
            }
        });
        self
    }

    /// Registers a callback for calls whose error propagated.
    pub fn on_propagated<F>(mut self, f: F) -> Self
    where
        F: Fn(Operation, PropagateReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &DegradeEvent| {
            if let DegradeEvent::Propagated {
                operation, reason, ..
            } = event
            {
                f(*operation, *reason);
            }
        });
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> DegradeConfig {
        DegradeConfig {
            name: self.name,
            classifier: Classifier::new(self.ignored, self.raise_errors),
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the degrade layer.
    pub fn build(self) -> crate::DegradeLayer {
        crate::DegradeLayer::new(self.build_config())
    }
}

impl Default for DegradeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configuration map: the two degrade options next to the wrapped client's own.
///
/// Unknown keys are left to `C`, so the same document that configures a
/// client can configure the decorator in front of it:
///
/// ```
/// use failover_cache::StoreOptions;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ClientOptions {
///     url: String,
/// }
///
/// let options: StoreOptions<ClientOptions> = serde_json::from_str(
///     r#"{ "url": "redis://replica:6379", "raise_errors": true }"#,
/// ).unwrap();
/// assert!(options.raise_errors);
/// assert!(options.ignored_command_errors.is_none());
/// assert_eq!(options.client.url, "redis://replica:6379");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions<C> {
    /// Replaces the default ignored set when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_command_errors: Option<Vec<String>>,

    /// Propagate every error. Defaults to `false`.
    #[serde(default)]
    pub raise_errors: bool,

    /// Everything else, passed through to the wrapped client.
    #[serde(flatten)]
    pub client: C,
}

impl<C> StoreOptions<C> {
    /// Options with the defaults for both degrade settings.
    pub fn new(client: C) -> Self {
        Self {
            ignored_command_errors: None,
            raise_errors: false,
            client,
        }
    }

    /// Splits the map into the client's options and a builder for the rest.
    pub fn into_parts(self) -> (C, DegradeConfigBuilder) {
        let mut builder = DegradeConfigBuilder::new().raise_errors(self.raise_errors);
        if let Some(messages) = self.ignored_command_errors {
            builder = builder.ignored_command_errors(messages);
        }
        (self.client, builder)
    }
}
