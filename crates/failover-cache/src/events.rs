//! Events emitted by the degrading store.

use crate::classify::PropagateReason;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// The cache operation a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`CacheStore::read`](crate::CacheStore::read)
    Read,
    /// [`CacheStore::write`](crate::CacheStore::write)
    Write,
    /// [`CacheStore::delete`](crate::CacheStore::delete)
    Delete,
    /// [`CacheStore::delete_matched`](crate::CacheStore::delete_matched)
    DeleteMatched,
    /// [`CacheStore::fetch_multi`](crate::CacheStore::fetch_multi)
    FetchMulti,
    /// [`CacheStore::increment`](crate::CacheStore::increment)
    Increment,
}

impl Operation {
    /// All six operations.
    pub const ALL: [Operation; 6] = [
        Operation::Read,
        Operation::Write,
        Operation::Delete,
        Operation::DeleteMatched,
        Operation::FetchMulti,
        Operation::Increment,
    ];

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::DeleteMatched => "delete_matched",
            Self::FetchMulti => "fetch_multi",
            Self::Increment => "increment",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted once per call, after the outcome is decided.
#[derive(Debug, Clone)]
pub enum DegradeEvent {
    /// The wrapped client succeeded.
    Success {
        /// Name of the store instance.
        store_name: String,
        /// The operation called.
        operation: Operation,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// An ignored command error was swallowed and the sentinel returned.
    Degraded {
        /// Name of the store instance.
        store_name: String,
        /// The operation called.
        operation: Operation,
        /// When the event occurred.
        timestamp: Instant,
        /// The command error message that matched.
        message: String,
    },

    /// The original error was returned to the caller.
    Propagated {
        /// Name of the store instance.
        store_name: String,
        /// The operation called.
        operation: Operation,
        /// When the event occurred.
        timestamp: Instant,
        /// Why the error was not degraded.
        reason: PropagateReason,
    },
}

impl DegradeEvent {
    /// Returns the type of event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Degraded { .. } => "degraded",
            Self::Propagated { .. } => "propagated",
        }
    }

    /// Returns when this event occurred.
    pub fn timestamp(&self) -> Instant {
        match self {
            Self::Success { timestamp, .. }
            | Self::Degraded { timestamp, .. }
            | Self::Propagated { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the name of the store that emitted this event.
    pub fn store_name(&self) -> &str {
        match self {
            Self::Success { store_name, .. }
            | Self::Degraded { store_name, .. }
            | Self::Propagated { store_name, .. } => store_name,
        }
    }

    /// Returns the operation the event belongs to.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Success { operation, .. }
            | Self::Degraded { operation, .. }
            | Self::Propagated { operation, .. } => *operation,
        }
    }
}

/// Receives [`DegradeEvent`]s.
pub trait DegradeListener: Send + Sync {
    /// Called for every event.
    fn on_event(&self, event: &DegradeEvent);
}

impl<F> DegradeListener for F
where
    F: Fn(&DegradeEvent) + Send + Sync,
{
    fn on_event(&self, event: &DegradeEvent) {
        self(event)
    }
}

/// The listeners registered on one configuration.
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Vec<Arc<dyn DegradeListener>>,
}

impl Listeners {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: DegradeListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener.
    ///
    /// A panicking listener is skipped; the rest still run.
    pub fn emit(&self, event: &DegradeEvent) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
