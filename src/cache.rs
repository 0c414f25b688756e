//! Bounded in-memory cache for expensive trace analyses
//!
//! A generic keyed store sitting in front of the parse/aggregate
//! pipeline, with:
//! - Typed composite keys (`identifier` + `network` + `method`)
//! - Byte-size accounting via serialized length
//! - Max-entries and max-bytes caps enforced on every `set`
//! - Four eviction strategies: LRU, LFU, TTL, size-aware
//! - Dependency-tag invalidation across entries
//! - A background sweeper task purging TTL-expired entries
//!
//! All access is linearized through one mutex per cache instance; the
//! sweeper takes the same lock as foreground callers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Which analysis produced a cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMethod {
    /// Single-transaction call trace analysis
    CallTracer,
    /// Opcode-level struct log analysis
    StructLog,
    /// Whole-block batch analysis
    BlockTrace,
    /// Supply history analysis
    SupplyHistory,
}

/// Typed composite cache key
///
/// Replaces string-concatenated keys: the three dimensions are
/// explicit fields, so no parsing and no delimiter collisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    /// Transaction hash, block number, or contract address
    pub identifier: String,
    /// Network the identifier belongs to (e.g. "mainnet")
    pub network: String,
    /// Analysis method the value came from
    pub method: TraceMethod,
}

impl CacheKey {
    /// Convenience constructor
    pub fn new(identifier: impl Into<String>, network: impl Into<String>, method: TraceMethod) -> Self {
        Self {
            identifier: identifier.into(),
            network: network.into(),
            method,
        }
    }
}

/// Eviction strategy applied when a cap is exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionStrategy {
    /// Evict the least recently accessed entry
    Lru,
    /// Evict the least frequently accessed entry
    Lfu,
    /// Evict the oldest entry
    Ttl,
    /// Evict the largest entry
    SizeAware,
}

/// Cache construction parameters
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Maximum total serialized size in bytes
    pub max_bytes: usize,
    /// TTL applied to entries that do not set their own
    pub default_ttl: Option<Duration>,
    /// Strategy used by the eviction loop
    pub strategy: EvictionStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_bytes: 16 * 1024 * 1024,
            default_ttl: Some(Duration::from_secs(300)),
            strategy: EvictionStrategy::Lru,
        }
    }
}

/// One cached value with its bookkeeping
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    last_accessed: Instant,
    access_count: u64,
    size_bytes: usize,
    ttl: Option<Duration>,
    tags: HashSet<String>,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(self.created_at) >= ttl,
            None => false,
        }
    }
}

/// Counters exposed by [`TraceCache::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Successful lookups
    pub hits: u64,
    /// Lookups that found nothing (or an expired entry)
    pub misses: u64,
    /// Entries removed by the capacity eviction loop
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current entry count
    pub entries: usize,
    /// Current total serialized size
    pub total_bytes: usize,
}

/// Mutable state behind the cache mutex
struct CacheState<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    total_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            total_bytes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }
}

/// Bounded, linearized cache for analysis results
///
/// `T` is any serializable result type; values are cloned out on `get`
/// so callers never hold references into the locked state.
pub struct TraceCache<T> {
    config: CacheConfig,
    state: Mutex<CacheState<T>>,
}

impl<T> TraceCache<T>
where
    T: Serialize + Clone,
{
    /// Create a cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Create a cache with the default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Look up a value, refreshing its access bookkeeping
    ///
    /// An expired entry counts as a miss and is removed on the spot.
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        let now = Instant::now();

        let expired = match state.entries.get(key) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            if let Some(entry) = state.entries.remove(key) {
                state.total_bytes -= entry.size_bytes;
                state.expirations += 1;
            }
            state.misses += 1;
            return None;
        }

        let entry = state.entries.get_mut(key).expect("entry checked above");
        entry.last_accessed = now;
        entry.access_count += 1;
        let value = entry.value.clone();
        state.hits += 1;
        Some(value)
    }

    /// Insert a value under the default TTL and no dependency tags
    pub fn set(&self, key: CacheKey, value: T) -> bool {
        self.set_with(key, value, None, Vec::new())
    }

    /// Insert a value with an explicit TTL and dependency tags
    ///
    /// Returns `false` when the value alone exceeds the byte cap; such
    /// a value is rejected rather than draining the whole cache.
    pub fn set_with(
        &self,
        key: CacheKey,
        value: T,
        ttl: Option<Duration>,
        tags: Vec<String>,
    ) -> bool {
        let size_bytes = serde_json::to_vec(&value).map(|v| v.len()).unwrap_or(0);
        if size_bytes > self.config.max_bytes {
            debug!(size_bytes, "rejecting oversized cache value");
            return false;
        }

        let mut state = self.state.lock().expect("cache mutex poisoned");
        let now = Instant::now();

        // Replace-in-place bookkeeping before capacity checks
        if let Some(old) = state.entries.remove(&key) {
            state.total_bytes -= old.size_bytes;
        }

        // Evict until the new entry fits both caps
        while state.entries.len() >= self.config.max_entries
            || state.total_bytes + size_bytes > self.config.max_bytes
        {
            let Some(victim) = self.pick_victim(&state) else {
                break;
            };
            if let Some(entry) = state.entries.remove(&victim) {
                state.total_bytes -= entry.size_bytes;
                state.evictions += 1;
                debug!(?victim, strategy = ?self.config.strategy, "evicted cache entry");
            }
        }

        state.total_bytes += size_bytes;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: now,
                access_count: 0,
                size_bytes,
                ttl: ttl.or(self.config.default_ttl),
                tags: tags.into_iter().collect(),
            },
        );
        true
    }

    /// Remove one entry; returns whether it existed
    pub fn delete(&self, key: &CacheKey) -> bool {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        match state.entries.remove(key) {
            Some(entry) => {
                state.total_bytes -= entry.size_bytes;
                true
            }
            None => false,
        }
    }

    /// Drop every entry, keeping the hit/miss counters
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        state.entries.clear();
        state.total_bytes = 0;
    }

    /// Remove every entry tagged with `tag`; returns the count removed
    ///
    /// Supports cross-entity invalidation: tagging analyses with the
    /// transaction hashes they cover lets one stale transaction flush
    /// every analysis referencing it.
    pub fn invalidate_by_dependency(&self, tag: &str) -> usize {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        let doomed: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.tags.contains(tag))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            if let Some(entry) = state.entries.remove(key) {
                state.total_bytes -= entry.size_bytes;
            }
        }
        doomed.len()
    }

    /// Remove all TTL-expired entries; returns the count removed
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        let now = Instant::now();
        let doomed: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            if let Some(entry) = state.entries.remove(key) {
                state.total_bytes -= entry.size_bytes;
                state.expirations += 1;
            }
        }
        doomed.len()
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache mutex poisoned");
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
        }
    }

    /// Pick the next eviction victim under the configured strategy
    fn pick_victim(&self, state: &CacheState<T>) -> Option<CacheKey> {
        let entries = state.entries.iter();
        let victim = match self.config.strategy {
            EvictionStrategy::Lru => entries.min_by_key(|(_, e)| e.last_accessed),
            EvictionStrategy::Lfu => entries.min_by_key(|(_, e)| e.access_count),
            EvictionStrategy::Ttl => entries.min_by_key(|(_, e)| e.created_at),
            EvictionStrategy::SizeAware => entries.max_by_key(|(_, e)| e.size_bytes),
        };
        victim.map(|(key, _)| key.clone())
    }
}

impl<T> TraceCache<T>
where
    T: Serialize + Clone + Send + 'static,
{
    /// Spawn a background task purging expired entries every `period`
    ///
    /// The task runs until aborted and takes the same lock as
    /// foreground access, so purges are linearized with `get`/`set`.
    pub fn spawn_sweeper(cache: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!(purged, "ttl sweep removed entries");
                }
            }
        })
    }
}
