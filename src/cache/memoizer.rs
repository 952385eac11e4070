//! TTL memoizer for expensive, idempotent service calls.

use super::backend::{CacheBackend, CacheEntry, MemoryCache};
use super::key::CacheKey;
use crate::types::Envelope;
use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct MemoizerConfig {
    pub ttl: Duration,
    pub enabled: bool,
}

impl Default for MemoizerConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            enabled: true,
        }
    }
}

impl MemoizerConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses caused by an expired entry (also counted in `misses`).
    pub stale: u64,
    pub sets: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Lazily-invalidated TTL cache.
///
/// Expiry is checked only on read and stale entries stay in the backend until
/// the next `set` on the same key overwrites them.
pub struct ResponseMemoizer {
    config: MemoizerConfig,
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
}

impl ResponseMemoizer {
    pub fn new(config: MemoizerConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            stats: AtomicStats::default(),
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(MemoizerConfig::new().with_ttl(ttl), Box::new(MemoryCache::new()))
    }

    pub fn key(&self, operation: &str, params: &serde_json::Value) -> CacheKey {
        CacheKey::new(operation, params)
    }

    /// A miss is `None`; backend and decode failures are counted and also read as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }
        match self.backend.get(key).await {
            Ok(Some(entry)) if entry.is_fresh() => match serde_json::from_slice(&entry.value) {
                Ok(v) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    Some(v)
                }
                Err(_) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            Ok(Some(_)) => {
                self.stats.stale.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key.as_str(), error = %e, "cache read failed");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let data = serde_json::to_vec(value)?;
        match self
            .backend
            .set(key, CacheEntry::new(data, self.config.ttl))
            .await
        {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Serve `operation(params)` from cache, or run `fetch` and remember its result.
    ///
    /// Hits come back with `cached = Some(true)`. `skip_cache` bypasses the lookup
    /// but still stores the fresh envelope. Unsuccessful envelopes are not stored.
    pub async fn memoize<T, F, Fut>(
        &self,
        operation: &str,
        params: &serde_json::Value,
        skip_cache: bool,
        fetch: F,
    ) -> Result<Envelope<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Envelope<T>>>,
    {
        let key = self.key(operation, params);
        if !skip_cache {
            if let Some(envelope) = self.get::<Envelope<T>>(&key).await {
                debug!(operation, "memoized response served");
                return Ok(envelope.mark_cached());
            }
        }

        let envelope = fetch().await?;
        if envelope.success {
            if let Err(e) = self.set(&key, &envelope).await {
                warn!(operation, error = %e, "failed to memoize response");
            }
        }
        Ok(envelope)
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        self.backend.delete(key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn len(&self) -> Result<usize> {
        self.backend.len().await
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
