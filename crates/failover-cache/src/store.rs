//! The cache-store contract shared by clients and the degrading decorator.

use crate::classify::CommandError;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Options accepted by [`CacheStore::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Time-to-live for the entry. `None` or a zero duration stores it without expiry.
    pub expires_in: Option<Duration>,
    /// Only write when the key does not already exist.
    pub unless_exist: bool,
}

impl WriteOptions {
    /// Options for an entry that expires after `ttl`.
    pub fn expires_in(ttl: Duration) -> Self {
        Self {
            expires_in: Some(ttl),
            ..Self::default()
        }
    }

    /// Sets SET NX semantics.
    pub fn unless_exist(mut self) -> Self {
        self.unless_exist = true;
        self
    }

    /// The expiry in whole seconds, if one applies.
    ///
    /// Sub-second durations round up to one second.
    pub fn ttl_secs(&self) -> Option<u64> {
        ttl_secs(self.expires_in)
    }
}

/// Options accepted by [`CacheStore::increment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementOptions {
    /// Expiry applied to the counter together with the increment.
    pub expires_in: Option<Duration>,
}

impl IncrementOptions {
    /// Options that set the counter to expire after `ttl`.
    pub fn expires_in(ttl: Duration) -> Self {
        Self {
            expires_in: Some(ttl),
        }
    }

    /// The expiry in whole seconds, if one applies.
    pub fn ttl_secs(&self) -> Option<u64> {
        ttl_secs(self.expires_in)
    }
}

fn ttl_secs(ttl: Option<Duration>) -> Option<u64> {
    match ttl {
        Some(ttl) if ttl.is_zero() => None,
        Some(ttl) if ttl.subsec_nanos() > 0 => Some(ttl.as_secs() + 1),
        Some(ttl) => Some(ttl.as_secs()),
        None => None,
    }
}

/// A key-value cache client.
///
/// The return shapes leave room for each operation's "did not happen"
/// outcome, so a decorator can stand in for the client without changing
/// any signature:
///
/// | Operation | `Ok` value | No-op outcome |
/// |---|---|---|
/// | [`read`](Self::read) | `Some(value)` | `None` (miss) |
/// | [`write`](Self::write) | `true` | `false` |
/// | [`delete`](Self::delete) | `true` | `false` |
/// | [`delete_matched`](Self::delete_matched) | `Some(count)` | `None` (scan not attempted) |
/// | [`fetch_multi`](Self::fetch_multi) | `Some(map)` | `None` |
/// | [`increment`](Self::increment) | `Some(new_value)` | `None` |
///
/// Implementations must report server-rejected commands through
/// [`CommandError::command_message`] and every transport failure as a
/// non-command error.
pub trait CacheStore: Send + Sync {
    /// The stored value type.
    type Value: Send + Sync + 'static;

    /// The client's error type.
    type Error: CommandError + Send + 'static;

    /// Reads a single key.
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Self::Value>, Self::Error>>;

    /// Writes a single key, returning whether the server acknowledged it.
    fn write<'a>(
        &'a self,
        key: &'a str,
        value: Self::Value,
        options: WriteOptions,
    ) -> BoxFuture<'a, Result<bool, Self::Error>>;

    /// Deletes a single key, returning whether it existed.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, Self::Error>>;

    /// Deletes every key matching a glob pattern, returning how many were removed.
    fn delete_matched<'a>(
        &'a self,
        pattern: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, Self::Error>>;

    /// Reads several keys at once. Missing keys are absent from the map.
    fn fetch_multi<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Option<HashMap<String, Self::Value>>, Self::Error>>;

    /// Atomically adds `amount` to a counter and returns the new value.
    ///
    /// With a TTL the increment and the expiry must reach the server as one
    /// atomic batch on one connection.
    fn increment<'a>(
        &'a self,
        key: &'a str,
        amount: i64,
        options: IncrementOptions,
    ) -> BoxFuture<'a, Result<Option<i64>, Self::Error>>;
}

impl<S> CacheStore for Arc<S>
where
    S: CacheStore + ?Sized,
{
    type Value = S::Value;
    type Error = S::Error;

    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Self::Value>, Self::Error>> {
        (**self).read(key)
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        value: Self::Value,
        options: WriteOptions,
    ) -> BoxFuture<'a, Result<bool, Self::Error>> {
        (**self).write(key, value, options)
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, Self::Error>> {
        (**self).delete(key)
    }

    fn delete_matched<'a>(
        &'a self,
        pattern: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, Self::Error>> {
        (**self).delete_matched(pattern)
    }

    fn fetch_multi<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Option<HashMap<String, Self::Value>>, Self::Error>> {
        (**self).fetch_multi(keys)
    }

    fn increment<'a>(
        &'a self,
        key: &'a str,
        amount: i64,
        options: IncrementOptions,
    ) -> BoxFuture<'a, Result<Option<i64>, Self::Error>> {
        (**self).increment(key, amount, options)
    }
}
