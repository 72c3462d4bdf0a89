//! Redis-backed cache client.

use crate::classify::CommandError;
use crate::store::{CacheStore, IncrementOptions, WriteOptions};
use futures::future::BoxFuture;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, RedisResult};
use std::borrow::Cow;
use std::collections::HashMap;

/// A [`CacheStore`] over a multiplexed Redis connection.
///
/// Cloning is cheap: clones share the underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Opens a connection to `url`.
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl CommandError for RedisError {
    /// Rebuilds the server's error line, `CODE detail`.
    ///
    /// Errors without a server code (I/O, timeouts, type conversions,
    /// client-side and authentication failures) are not command errors.
    fn command_message(&self) -> Option<Cow<'_, str>> {
        if self.is_io_error() || self.is_timeout() || self.is_connection_dropped() {
            return None;
        }
        let code = self.code()?;
        Some(match self.detail() {
            Some(detail) => Cow::Owned(format!("{code} {detail}")),
            None => Cow::Borrowed(code),
        })
    }
}

impl CacheStore for RedisStore {
    type Value = Vec<u8>;
    type Error = RedisError;

    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, RedisResult<Option<Vec<u8>>>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok(value)
        })
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        options: WriteOptions,
    ) -> BoxFuture<'a, RedisResult<bool>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            if let Some(secs) = options.ttl_secs() {
                cmd.arg("EX").arg(secs);
            }
            if options.unless_exist {
                cmd.arg("NX");
            }
            // NX answers nil when the key already exists.
            let reply: Option<String> = cmd.query_async(&mut conn).await?;
            Ok(reply.is_some())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, RedisResult<bool>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(removed > 0)
        })
    }

    fn delete_matched<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, RedisResult<Option<u64>>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
            if keys.is_empty() {
                return Ok(Some(0));
            }
            let removed: u64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
            Ok(Some(removed))
        })
    }

    fn fetch_multi<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, RedisResult<Option<HashMap<String, Vec<u8>>>>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(Some(HashMap::new()));
            }
            let values: Vec<Option<Vec<u8>>> =
                redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
            let found = keys
                .iter()
                .zip(values)
                .filter_map(|(key, value)| value.map(|v| ((*key).to_string(), v)))
                .collect();
            Ok(Some(found))
        })
    }

    fn increment<'a>(
        &'a self,
        key: &'a str,
        amount: i64,
        options: IncrementOptions,
    ) -> BoxFuture<'a, RedisResult<Option<i64>>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let value: i64 = match options.ttl_secs() {
                Some(secs) => {
                    // One MULTI/EXEC: nobody sees the counter without its expiry.
                    let (value,): (i64,) = redis::pipe()
                        .atomic()
                        .cmd("INCRBY")
                        .arg(key)
                        .arg(amount)
                        .cmd("EXPIRE")
                        .arg(key)
                        .arg(secs)
                        .ignore()
                        .query_async(&mut conn)
                        .await?;
                    value
                }
                None => {
                    redis::cmd("INCRBY")
                        .arg(key)
                        .arg(amount)
                        .query_async(&mut conn)
                        .await?
                }
            };
            Ok(Some(value))
        })
    }
}
