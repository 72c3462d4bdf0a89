//! In-memory cache client modelled on a single Redis node.
//!
//! Besides storing data, [`MemoryStore`] can record every command it accepts
//! and can be pushed into the states a node passes through during failover,
//! which makes it the reference collaborator for exercising a
//! [`DegradingStore`](crate::DegradingStore).

use crate::error::StoreError;
use crate::store::{CacheStore, IncrementOptions, WriteOptions};
use futures::future::{self, BoxFuture};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const READONLY: &str = "READONLY You can't write against a read only slave.";
const LOADING: &str = "LOADING Redis is loading the dataset in memory";
const ELASTICACHE_REPLICA: &str = "A write operation was issued to an ELASTICACHE slave node.";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";
const OVERFLOW: &str = "ERR increment or decrement would overflow";

/// A command as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, upper case.
    pub name: &'static str,
    /// Arguments in wire order.
    pub args: Vec<String>,
}

impl Command {
    /// Creates a command.
    pub fn new<I, A>(name: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// One journal entry: a lone command or an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issued {
    /// A command sent on its own.
    Command(Command),
    /// Commands applied together with nothing interleaved (`MULTI`/`EXEC`).
    Batch(Vec<Command>),
}

/// The role a node is playing, as seen by its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Failover {
    /// Serving reads and writes.
    #[default]
    Healthy,
    /// Demoted to replica: writes fail with `READONLY`.
    ReadOnlyReplica,
    /// ElastiCache replica: writes fail with ElastiCache's own message.
    ElastiCacheReplica,
    /// Promoted but still loading its dataset: every command fails with `LOADING`.
    Loading,
}

impl Failover {
    fn rejection(self, write: bool) -> Option<StoreError> {
        match self {
            Self::Healthy => None,
            Self::Loading => Some(StoreError::command(LOADING)),
            Self::ReadOnlyReplica if write => Some(StoreError::command(READONLY)),
            Self::ElastiCacheReplica if write => Some(StoreError::command(ELASTICACHE_REPLICA)),
            Self::ReadOnlyReplica | Self::ElastiCacheReplica => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    journal: Vec<Issued>,
    recording: bool,
    failover: Failover,
    fault: Option<StoreError>,
}

impl State {
    fn admit(&self, write: bool) -> Result<(), StoreError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        match self.failover.rejection(write) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|_, e| !e.is_expired(now));
    }

    fn record(&mut self, issued: impl FnOnce() -> Issued) {
        if self.recording {
            self.journal.push(issued());
        }
    }
}

/// An in-memory [`CacheStore`] with a command journal and failover simulation.
///
/// Values are strings; counters are stored as decimal strings, as Redis does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty, healthy store that keeps no journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty, healthy store that records every accepted command.
    pub fn with_journal() -> Self {
        let store = Self::default();
        store.lock().recording = true;
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts the node into a failover state.
    pub fn set_failover(&self, failover: Failover) {
        self.lock().failover = failover;
    }

    /// The current failover state.
    pub fn failover(&self) -> Failover {
        self.lock().failover
    }

    /// Fails every subsequent call with `error` until [`heal`](Self::heal).
    pub fn fail_with(&self, error: StoreError) {
        self.lock().fault = Some(error);
    }

    /// Clears any injected fault and returns the node to [`Failover::Healthy`].
    pub fn heal(&self) {
        let mut state = self.lock();
        state.fault = None;
        state.failover = Failover::Healthy;
    }

    /// Every command accepted so far, oldest first.
    ///
    /// Commands the node rejects never reach the journal. Always empty unless
    /// the store was created with [`with_journal`](Self::with_journal).
    pub fn journal(&self) -> Vec<Issued> {
        self.lock().journal.clone()
    }

    /// Forgets the journal.
    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let mut state = self.lock();
        state.purge_expired(Instant::now());
        state.entries.len()
    }

    /// Returns `true` if no live key exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.lock();
        state.admit(false)?;
        state.record(|| Issued::Command(Command::new("GET", [key])));
        Ok(state.live(key, Instant::now()).map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: String, options: &WriteOptions) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.admit(true)?;

        let ttl = options.ttl_secs();
        state.record(|| {
            let mut command = Command::new("SET", [key, value.as_str()]);
            if let Some(secs) = ttl {
                command.args.extend(["EX".to_string(), secs.to_string()]);
            }
            if options.unless_exist {
                command.args.push("NX".to_string());
            }
            Issued::Command(command)
        });

        let now = Instant::now();
        if options.unless_exist && state.live(key, now).is_some() {
            return Ok(false);
        }
        state.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|secs| now + Duration::from_secs(secs)),
            },
        );
        Ok(true)
    }

    fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.admit(true)?;
        state.record(|| Issued::Command(Command::new("DEL", [key])));
        let existed = state.live(key, Instant::now()).is_some();
        state.entries.remove(key);
        Ok(existed)
    }

    fn del_matched(&self, pattern: &str) -> Result<Option<u64>, StoreError> {
        let mut state = self.lock();
        state.admit(false)?;
        state.record(|| Issued::Command(Command::new("KEYS", [pattern])));

        state.purge_expired(Instant::now());
        let mut matched: Vec<String> = state
            .entries
            .keys()
            .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Ok(Some(0));
        }
        matched.sort();

        state.admit(true)?;
        for key in &matched {
            state.entries.remove(key);
        }
        let deleted = matched.len() as u64;
        state.record(|| Issued::Command(Command::new("DEL", matched)));
        Ok(Some(deleted))
    }

    fn mget(&self, keys: &[&str]) -> Result<Option<HashMap<String, String>>, StoreError> {
        let mut state = self.lock();
        state.admit(false)?;
        if keys.is_empty() {
            return Ok(Some(HashMap::new()));
        }
        state.record(|| Issued::Command(Command::new("MGET", keys.iter().copied())));

        let now = Instant::now();
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = state.live(key, now) {
                found.insert((*key).to_string(), entry.value.clone());
            }
        }
        Ok(Some(found))
    }

    fn incr(
        &self,
        key: &str,
        amount: i64,
        options: &IncrementOptions,
    ) -> Result<Option<i64>, StoreError> {
        let mut state = self.lock();
        state.admit(true)?;

        let now = Instant::now();
        let current = match state.live(key, now) {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|_| StoreError::command(NOT_AN_INTEGER))?,
            None => 0,
        };
        let next = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::command(OVERFLOW))?;

        let ttl = options.ttl_secs();
        state.record(|| {
            let incr = Command::new("INCRBY", [key.to_string(), amount.to_string()]);
            match ttl {
                Some(secs) => Issued::Batch(vec![
                    incr,
                    Command::new("EXPIRE", [key.to_string(), secs.to_string()]),
                ]),
                None => Issued::Command(incr),
            }
        });

        // INCRBY keeps an existing expiry; EXPIRE replaces it.
        let expires_at = match ttl {
            Some(secs) => Some(now + Duration::from_secs(secs)),
            None => state.entries.get(key).and_then(|e| e.expires_at),
        };
        state.entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(Some(next))
    }
}

impl CacheStore for MemoryStore {
    type Value = String;
    type Error = StoreError;

    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(future::ready(self.get(key)))
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        value: String,
        options: WriteOptions,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(future::ready(self.set(key, value, &options)))
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(future::ready(self.del(key)))
    }

    fn delete_matched<'a>(
        &'a self,
        pattern: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, StoreError>> {
        Box::pin(future::ready(self.del_matched(pattern)))
    }

    fn fetch_multi<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, Result<Option<HashMap<String, String>>, StoreError>> {
        Box::pin(future::ready(self.mget(keys)))
    }

    fn increment<'a>(
        &'a self,
        key: &'a str,
        amount: i64,
        options: IncrementOptions,
    ) -> BoxFuture<'a, Result<Option<i64>, StoreError>> {
        Box::pin(future::ready(self.incr(key, amount, &options)))
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a-z]` and `\` escapes.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        let advanced = match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => {
                p += 1;
                true
            }
            Some(b'[') => match match_class(pattern, p, text[t]) {
                Some((true, next)) => {
                    p = next;
                    true
                }
                Some((false, _)) => false,
                None if text[t] == b'[' => {
                    p += 1;
                    true
                }
                None => false,
            },
            Some(b'\\') if p + 1 < pattern.len() => {
                if pattern[p + 1] == text[t] {
                    p += 2;
                    true
                } else {
                    false
                }
            }
            Some(&c) if c == text[t] => {
                p += 1;
                true
            }
            _ => false,
        };

        if advanced {
            t += 1;
            continue;
        }
        match star {
            Some((sp, st)) => {
                p = sp + 1;
                t = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }

    while pattern.get(p) == Some(&b'*') {
        p += 1;
    }
    p == pattern.len()
}

/// Matches `c` against the class opening at `pattern[open]`.
///
/// Returns whether it matched and the index after the closing `]`, or `None`
/// when the class is never closed.
fn match_class(pattern: &[u8], open: usize, c: u8) -> Option<(bool, usize)> {
    let mut i = open + 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    loop {
        let b = *pattern.get(i)?;
        if b == b']' {
            break;
        }
        let lo = if b == b'\\' {
            i += 1;
            *pattern.get(i)?
        } else {
            b
        };
        match (pattern.get(i + 1), pattern.get(i + 2)) {
            (Some(b'-'), Some(&hi)) if hi != b']' => {
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            _ => {
                matched |= lo == c;
                i += 1;
            }
        }
    }
    Some((matched != negate, i + 1))
}
