//! In-memory strategy store
//!
//! Volatile, cleared on restart. Uses Moka with a per-entry expiry so each
//! caching strategy can choose its own TTL, plus a short-lived hot-key set
//! used by adaptive policies.

use moka::Expiry;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a key stays "hot" after a cache hit
pub const HOT_KEY_WINDOW: Duration = Duration::from_secs(3600);

/// Stored value with the TTL it was filled with
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub ttl: Duration,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            ttl: self.ttl,
        }
    }
}

struct EntryExpiry;

impl<V> Expiry<String, CacheEntry<V>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Shared key/value store behind every caching strategy
///
/// Keys are plain strings; callers namespace them (`<strategy>:photo:<id>`).
pub struct StrategyStore<V> {
    entries: Cache<String, CacheEntry<V>>,
    hot_keys: Cache<String, ()>,
}

impl<V> StrategyStore<V>
where
    V: Send + Sync + 'static,
{
    /// Create a store bounded to `max_entries` values
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        let hot_keys = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(HOT_KEY_WINDOW)
            .build();

        Self { entries, hot_keys }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    /// Insert or replace `key`, expiring after `ttl`
    pub async fn insert(&self, key: String, value: Arc<V>, ttl: Duration) {
        self.entries.insert(key, CacheEntry { value, ttl }).await;
        self.record_size();
    }

    /// Remove `key`; returns whether it was present
    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).await.is_some();
        self.record_size();
        removed
    }

    pub async fn mark_hot(&self, key: &str) {
        self.hot_keys.insert(key.to_string(), ()).await;
    }

    pub async fn is_hot(&self, key: &str) -> bool {
        self.hot_keys.contains_key(key)
    }

    /// Keys currently stored that match a glob pattern (`*` and `?`)
    pub fn matching_keys(&self, pattern: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.as_ref().clone())
            .collect()
    }

    /// Remove every key matching `pattern`; returns the number removed
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let mut removed = 0;
        for key in self.matching_keys(pattern) {
            if self.entries.remove(&key).await.is_some() {
                removed += 1;
            }
        }
        self.record_size();
        removed
    }

    /// Drop all entries and hot-key marks
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.hot_keys.invalidate_all();
        self.entries.run_pending_tasks().await;
        self.hot_keys.run_pending_tasks().await;
        self.record_size();
    }

    /// Number of live keys starting with `prefix`
    pub async fn count_prefix(&self, prefix: &str) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .count() as u64
    }

    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    fn record_size(&self) {
        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["strategy_store"])
            .set(self.entries.entry_count() as i64);
    }
}

/// Match `text` against a glob where `*` spans any run and `?` one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
