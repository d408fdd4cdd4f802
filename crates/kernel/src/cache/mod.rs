//! In-memory TTL cache with glob-style invalidation.
//!
//! Values are stored as JSON so one cache can hold API responses, rows and
//! rendered fragments alike. Keys are plain strings; [`CacheService::generate_key`]
//! builds the conventional `prefix:type[:id]` form.

use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Maximum number of entries held at once (soft cap).
///
/// Under concurrent load the cache may briefly exceed this by a few entries
/// because DashMap's `len()` is computed per shard.
const MAX_CACHE_ENTRIES: usize = 10_000;

/// Cache construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Default time-to-live in seconds.
    pub ttl_secs: u64,

    /// Prefix used by [`CacheService::generate_key`].
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn new(ttl_secs: u64, key_prefix: impl Into<String>) -> Self {
        Self {
            ttl_secs,
            key_prefix: key_prefix.into(),
        }
    }

    /// API responses: 5 minutes.
    pub fn api() -> Self {
        Self::new(300, "api")
    }

    /// User records: 10 minutes.
    pub fn user() -> Self {
        Self::new(600, "user")
    }

    /// Content items: 5 minutes.
    pub fn content() -> Self {
        Self::new(300, "content")
    }

    /// Collection definitions: 10 minutes.
    pub fn collection() -> Self {
        Self::new(600, "collection")
    }
}

/// Where a [`CacheResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    Memory,
    None,
    Expired,
}

/// Lookup outcome with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheResult {
    pub hit: bool,
    pub data: Option<Value>,
    pub source: CacheSource,

    /// Seconds until the entry expires (hits only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<f64>,
}

impl CacheResult {
    fn miss(source: CacheSource) -> Self {
        Self {
            hit: false,
            data: None,
            source,
            ttl: None,
        }
    }
}

#[derive(Clone)]
struct CachedEntry {
    data: Value,
    inserted_at: Instant,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Key-prefixed in-memory cache.
pub struct CacheService {
    config: CacheConfig,
    entries: DashMap<String, CachedEntry>,
}

impl CacheService {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// `prefix:type` or `prefix:type:id`.
    pub fn generate_key(&self, kind: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}:{kind}:{id}", self.config.key_prefix),
            None => format!("{}:{kind}", self.config.key_prefix),
        }
    }

    /// Fetch a live entry. Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    /// Like [`get`](Self::get), reporting whether the entry was missing or
    /// expired, and how long a hit has left to live.
    pub fn get_with_source(&self, key: &str) -> CacheResult {
        self.get_with_source_at(key, Instant::now())
    }

    /// Store `value` for `ttl_secs`, or the configured default.
    pub fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) {
        self.set_at(key, value, ttl_secs, Instant::now());
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every key matching a glob pattern (`*` any run, `?` any one
    /// character). Returns the number of entries removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let regex = match glob_to_regex(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid cache invalidation pattern");
                return 0;
            }
        };

        let before = self.entries.len();
        self.entries.retain(|key, _| !regex.is_match(key));
        let removed = before.saturating_sub(self.entries.len());

        debug!(pattern = %pattern, removed, "cache invalidated");
        removed
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached value for `key`, or run `load`, cache its result
    /// and return it. Loader errors are passed through and nothing is cached.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        load: F,
        ttl_secs: Option<u64>,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = load().await?;
        self.set(key, value.clone(), ttl_secs);
        Ok(value)
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        self.get_with_source_at(key, now).data
    }

    fn get_with_source_at(&self, key: &str, now: Instant) -> CacheResult {
        let Some(entry) = self.entries.get(key) else {
            return CacheResult::miss(CacheSource::None);
        };

        if entry.is_expired(now) {
            // Drop the read guard before removing from the same shard
            drop(entry);
            self.remove_expired(key, now);
            debug!(key = %key, "cache entry expired");
            return CacheResult::miss(CacheSource::Expired);
        }

        CacheResult {
            hit: true,
            data: Some(entry.data.clone()),
            source: CacheSource::Memory,
            ttl: Some(entry.expires_at.saturating_duration_since(now).as_secs_f64()),
        }
    }

    /// Remove `key` only if the stored entry is still expired; a `set` that
    /// raced in after the read is kept.
    fn remove_expired(&self, key: &str, now: Instant) -> bool {
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
    }

    fn set_at(&self, key: &str, value: Value, ttl_secs: Option<u64>, now: Instant) {
        let ttl = Duration::from_secs(ttl_secs.unwrap_or(self.config.ttl_secs));

        if self.entries.len() >= MAX_CACHE_ENTRIES && !self.entries.contains_key(key) {
            self.evict(now);
        }

        self.entries.insert(
            key.to_string(),
            CachedEntry {
                data: value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Make room: drop expired entries, then the oldest one if still full.
    fn evict(&self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));

        if self.entries.len() >= MAX_CACHE_ENTRIES {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.inserted_at)
                .map(|entry| entry.key().clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
    }
}

/// Compile a glob into an anchored regex. Only `*` and `?` are special.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source)
}
