//! Request Cache Engine
//!
//! Sits between application code and a remote data source. Lookups decide
//! between a hit, a stale serve with refresh, and a fetch; every fetch for a
//! key goes through a single in-flight slot so concurrent callers share one
//! request.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::eviction;
use crate::cache::{
    CacheEntry, CacheStats, Clock, KeyNormalizer, PrefetchRequest, RequestOptions, Store,
    SystemClock, WarmUpEntry,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, FetchError, Result};
use crate::persistence::{decode_snapshot, encode_snapshot, PersistenceBackend};

/// Bytes added per entry on top of key and value in the memory estimate.
const ENTRY_OVERHEAD_BYTES: usize = 100;

/// Values the cache can hold: shareable across tasks and persistable.
pub trait CacheValue: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Handle to a running fetch; every clone resolves to the same result.
type InFlight<V> = Shared<BoxFuture<'static, std::result::Result<V, FetchError>>>;

struct State<V> {
    store: Store<V>,
    stats: CacheStats,
    /// At most one running fetch per normalized key
    in_flight: HashMap<String, InFlight<V>>,
}

impl<V: CacheValue> State<V> {
    fn new() -> Self {
        Self {
            store: Store::new(),
            stats: CacheStats::new(),
            in_flight: HashMap::new(),
        }
    }

    fn sync_size(&mut self) {
        let size = self.store.len();
        self.stats.set_size(size);
    }

    /// Loads a persisted snapshot, dropping records expired at `now_ms`.
    fn restore(&mut self, backend: &dyn PersistenceBackend, max_size: usize, now_ms: u64) {
        let bytes = match backend.load() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(err) => {
                warn!("Failed to load cache from persistence: {}", err);
                return;
            }
        };

        let mut records = match decode_snapshot::<V>(&bytes) {
            Ok(records) => records,
            Err(err) => {
                warn!("Failed to load cache from persistence: {}", err);
                return;
            }
        };

        let total = records.len();
        records.sort_by_key(|record| record.timestamp);
        for record in records.into_iter().filter(|record| !record.is_expired(now_ms)) {
            self.store.insert(record.into_entry());
        }
        let evicted = eviction::enforce_max_size(&mut self.store, max_size);
        self.stats.record_evictions(evicted.len());
        self.sync_size();

        info!(
            "Loaded {} cache entries from persistence ({} expired or over capacity)",
            self.store.len(),
            total - self.store.len()
        );
    }
}

struct Inner<V> {
    state: RwLock<State<V>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    normalizer: KeyNormalizer,
    persistence: Option<Arc<dyn PersistenceBackend>>,
}

enum Lookup<V> {
    /// Answer from the store (live hit or stale serve)
    Cached(V),
    /// Wait for the in-flight fetch
    Wait(InFlight<V>),
}

// == Request Cache ==
/// Client-side request cache.
///
/// Cloning is cheap and every clone shares the same store.
pub struct RequestCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: CacheValue> RequestCache<V> {
    // == Constructors ==
    /// Creates a memory-only cache using the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), None)
    }

    /// Creates a cache that persists to `backend` when persistence is enabled.
    pub fn with_backend(config: CacheConfig, backend: Arc<dyn PersistenceBackend>) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), Some(backend))
    }

    /// Creates a cache from explicit parts.
    ///
    /// When persistence is enabled and a backend is given, the stored snapshot
    /// is loaded here; entries already expired are dropped.
    pub fn with_parts(
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        backend: Option<Arc<dyn PersistenceBackend>>,
    ) -> Self {
        let persistence = if config.enable_persistence {
            backend
        } else {
            None
        };

        let mut state = State::new();
        if let Some(backend) = &persistence {
            state.restore(backend.as_ref(), config.max_size, clock.now_ms());
        }

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                normalizer: KeyNormalizer::new(&config.ignored_query_params),
                config,
                clock,
                persistence,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Current time on the cache's clock, in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    // == Get ==
    /// Returns the cached value for `key`, fetching it when needed.
    ///
    /// - live entry: returned at once; past the refresh threshold a background
    ///   refresh is started unless one is already running
    /// - stale entry with `options.background`: the stale value is returned
    ///   and a refresh is started or joined
    /// - otherwise (or with `options.force`): the caller waits for a fetch,
    ///   joining one already in flight for the key
    ///
    /// A failed fetch never creates or touches an entry and is returned as
    /// [`CacheError::Fetch`].
    pub async fn get<F, Fut>(&self, key: &str, fetch: F, options: RequestOptions) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let key = self.inner.normalizer.normalize(key);

        let lookup = {
            let mut state = self.inner.state.write().await;
            self.inner.lookup_locked(&mut state, &key, fetch, options)
        };

        match lookup {
            Lookup::Cached(value) => Ok(value),
            Lookup::Wait(in_flight) => in_flight
                .await
                .map_err(|source| CacheError::Fetch { key, source }),
        }
    }

    // == Set ==
    /// Writes a value directly, without fetching.
    pub async fn set(&self, key: &str, value: V, options: RequestOptions) {
        let key = self.inner.normalizer.normalize(key);
        let mut state = self.inner.state.write().await;
        self.inner.insert_locked(&mut state, key, value, &options);
        self.inner.persist(&state);
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present.
    pub async fn delete(&self, key: &str) -> bool {
        let key = self.inner.normalizer.normalize(key);
        let mut state = self.inner.state.write().await;
        let removed = state.store.remove(&key).is_some();
        if removed {
            state.sync_size();
            self.inner.persist(&state);
            if self.inner.config.debug_mode {
                debug!("Deleted cache entry: {}", key);
            }
        }
        removed
    }

    // == Has ==
    /// Whether a live entry exists. Does not count as a hit or miss.
    pub async fn has(&self, key: &str) -> bool {
        let key = self.inner.normalizer.normalize(key);
        let now = self.inner.clock.now_ms();
        let state = self.inner.state.read().await;
        state
            .store
            .get(&key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    // == Invalidate ==
    /// Removes every key matching the regular expression `pattern`.
    ///
    /// Returns the number of entries removed, or
    /// [`CacheError::InvalidPattern`] if the pattern does not compile.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        Ok(self.invalidate_regex(&regex).await)
    }

    /// Removes every key matched by `regex`. Returns the number removed.
    pub async fn invalidate_regex(&self, regex: &Regex) -> usize {
        let mut state = self.inner.state.write().await;
        let removed = state.store.remove_where(|entry| regex.is_match(&entry.key));
        if !removed.is_empty() {
            state.sync_size();
            self.inner.persist(&state);
            info!(
                "Invalidated {} cache entries matching pattern: {}",
                removed.len(),
                regex.as_str()
            );
        }
        removed.len()
    }

    // == Clear ==
    /// Removes every entry. Fetches already in flight still complete and
    /// write their result.
    pub async fn clear(&self) {
        let mut state = self.inner.state.write().await;
        state.store.clear();
        state.sync_size();
        self.inner.persist(&state);
        info!("Cache cleared");
    }

    // == Prefetch ==
    /// Issues a background-enabled `get` for each request and waits for all
    /// of them. Individual failures are logged and do not abort the batch.
    pub async fn prefetch(&self, requests: Vec<PrefetchRequest<V>>) {
        let count = requests.len();
        let lookups = requests.into_iter().map(|request| {
            let PrefetchRequest {
                key,
                fetch,
                options,
            } = request;
            let cache = self.clone();
            async move {
                let options = RequestOptions {
                    background: true,
                    ..options
                };
                if let Err(err) = cache.get(&key, fetch, options).await {
                    warn!("Prefetch failed for key {}: {}", key, err);
                }
            }
        });

        join_all(lookups).await;
        debug!("Prefetched {} cache entries", count);
    }

    // == Warm Up ==
    /// Seeds the cache with known values without fetching.
    pub async fn warm_up(&self, entries: Vec<WarmUpEntry<V>>) {
        let count = entries.len();
        let mut state = self.inner.state.write().await;
        for entry in entries {
            let key = self.inner.normalizer.normalize(&entry.key);
            self.inner
                .insert_locked(&mut state, key, entry.value, &entry.options);
        }
        self.inner.persist(&state);
        info!("Warmed up cache with {} entries", count);
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.read().await;
        let mut stats = state.stats.clone();
        stats.set_size(state.store.len());
        stats.set_memory_usage(estimate_memory_usage(&state.store));
        stats
    }

    // == Introspection ==
    /// All stored keys, live or stale.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.state.read().await.store.keys()
    }

    /// Copy of the stored entry for `key`, live or stale.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let key = self.inner.normalizer.normalize(key);
        self.inner.state.read().await.store.get(&key).cloned()
    }

    /// Whether a fetch for `key` is currently running.
    pub async fn is_refreshing(&self, key: &str) -> bool {
        let key = self.inner.normalizer.normalize(key);
        self.inner.state.read().await.in_flight.contains_key(&key)
    }

    /// Normalized form of `key` as used by the store.
    pub fn normalize_key(&self, key: &str) -> String {
        self.inner.normalizer.normalize(key)
    }

    // == Sweep ==
    /// Removes every expired entry. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.inner.clock.now_ms();
        let mut state = self.inner.state.write().await;
        let removed = eviction::sweep_expired(&mut state.store, now);
        if !removed.is_empty() {
            state.sync_size();
            self.inner.persist(&state);
        }
        removed.len()
    }

    // == Shutdown ==
    /// Flushes the store to persistence.
    pub async fn shutdown(&self) {
        let state = self.inner.state.read().await;
        self.inner.persist(&state);
        info!("Request cache flushed ({} entries)", state.store.len());
    }
}

impl<V: CacheValue> Inner<V> {
    fn lookup_locked<F, Fut>(
        self: &Arc<Self>,
        state: &mut State<V>,
        key: &str,
        fetch: F,
        options: RequestOptions,
    ) -> Lookup<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let now = self.clock.now_ms();
        let config = &self.config;
        state.stats.record_request();

        let cached = state.store.get(key).map(|entry| {
            (
                entry.value.clone(),
                entry.is_expired(now),
                entry.past_refresh_threshold(now, config.background_refresh_threshold),
            )
        });

        match cached {
            Some((value, false, aging)) if !options.force => {
                state.stats.record_hit();
                if config.debug_mode {
                    debug!("Cache HIT for key: {}", key);
                }
                if config.enable_background_refresh && aging && !state.in_flight.contains_key(key)
                {
                    state.stats.record_background_refresh();
                    debug!("Starting background refresh for key: {}", key);
                    let _ = self.join_or_start(state, key, fetch, options);
                }
                Lookup::Cached(value)
            }
            Some((value, true, _))
                if !options.force && options.background && config.enable_background_refresh =>
            {
                state.stats.record_miss();
                if config.debug_mode {
                    debug!("Returning stale data and refreshing in background: {}", key);
                }
                if !state.in_flight.contains_key(key) {
                    state.stats.record_background_refresh();
                }
                let _ = self.join_or_start(state, key, fetch, options);
                Lookup::Cached(value)
            }
            _ => {
                state.stats.record_miss();
                if config.debug_mode {
                    debug!("Cache MISS for key: {}", key);
                }
                Lookup::Wait(self.join_or_start(state, key, fetch, options))
            }
        }
    }

    /// Returns the in-flight fetch for `key`, starting one if none runs.
    ///
    /// Check and registration happen under the caller's write guard, so two
    /// callers can never both start a fetch for the same key.
    fn join_or_start<F, Fut>(
        self: &Arc<Self>,
        state: &mut State<V>,
        key: &str,
        fetch: F,
        options: RequestOptions,
    ) -> InFlight<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        if let Some(in_flight) = state.in_flight.get(key) {
            return in_flight.clone();
        }

        let in_flight = self.spawn_fetch(key.to_string(), fetch, options);
        state.in_flight.insert(key.to_string(), in_flight.clone());
        in_flight
    }

    /// Runs `fetch` on its own task so it completes even if every caller
    /// goes away. The task clears the in-flight slot whatever the outcome.
    fn spawn_fetch<F, Fut>(self: &Arc<Self>, key: String, fetch: F, options: RequestOptions) -> InFlight<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            if inner.config.debug_mode {
                debug!("Fetching fresh data for key: {}", key);
            }
            let outcome = AssertUnwindSafe(async move { fetch().await })
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(FetchError::new(err)),
                Err(_) => Err(FetchError::new(anyhow!("fetch function panicked"))),
            };
            inner.complete_fetch(&key, &result, &options).await;
            result
        });

        async move {
            task.await.unwrap_or_else(|err| {
                Err(FetchError::new(anyhow!("fetch task did not complete: {}", err)))
            })
        }
        .boxed()
        .shared()
    }

    async fn complete_fetch(
        &self,
        key: &str,
        result: &std::result::Result<V, FetchError>,
        options: &RequestOptions,
    ) {
        let mut state = self.state.write().await;
        state.in_flight.remove(key);
        match result {
            Ok(value) => {
                self.insert_locked(&mut state, key.to_string(), value.clone(), options);
                self.persist(&state);
            }
            Err(err) => {
                warn!("Fetch failed for key {}, cached entry left untouched: {}", key, err);
            }
        }
    }

    /// Writes an entry and enforces the size bound. Does not persist.
    fn insert_locked(&self, state: &mut State<V>, key: String, value: V, options: &RequestOptions) {
        let ttl = options
            .ttl
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.config.default_ttl);
        let now = self.clock.now_ms();

        if self.config.debug_mode {
            debug!("Cached data for key: {}", key);
        }
        state.store.insert(CacheEntry::new(
            key,
            value,
            now,
            ttl,
            options.validators.clone(),
        ));

        let evicted = eviction::enforce_max_size(&mut state.store, self.config.max_size);
        if !evicted.is_empty() {
            state.stats.record_evictions(evicted.len());
            debug!("Evicted {} cache entries due to size limit", evicted.len());
        }
        state.sync_size();
    }

    /// Saves the whole store. Failures are logged and otherwise ignored.
    ///
    /// Runs under the write guard so snapshots land in mutation order. On a
    /// multi-threaded runtime the blocking save is moved off the worker with
    /// `block_in_place`, letting other tasks keep running meanwhile.
    fn persist(&self, state: &State<V>) {
        let Some(backend) = &self.persistence else {
            return;
        };
        let saved = encode_snapshot(state.store.iter())
            .and_then(|bytes| run_blocking(|| backend.save(&bytes)));
        if let Err(err) = saved {
            warn!("Failed to save cache to persistence: {}", err);
        }
    }
}

/// Runs blocking I/O without stalling a multi-threaded runtime worker.
///
/// `block_in_place` panics on a current-thread runtime, so there the closure
/// runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn estimate_memory_usage<V: Serialize>(store: &Store<V>) -> usize {
    store
        .iter()
        .map(|entry| {
            let value_len = serde_json::to_vec(&entry.value)
                .map(|bytes| bytes.len())
                .unwrap_or(0);
            value_len * 2 + entry.key.len() * 2 + ENTRY_OVERHEAD_BYTES
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::PersistenceError;
    use crate::persistence::{FileBackend, MemoryBackend};
    use std::time::Duration;

    #[derive(Debug)]
    struct BrokenBackend;

    impl PersistenceBackend for BrokenBackend {
        fn load(&self) -> std::result::Result<Option<Vec<u8>>, PersistenceError> {
            Err(PersistenceError::Unavailable("disk gone".to_string()))
        }

        fn save(&self, _bytes: &[u8]) -> std::result::Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("disk gone".to_string()))
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            default_ttl: Duration::from_millis(1_000),
            max_size: 10,
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn test_set_and_get_hit() {
        let cache: RequestCache<String> = RequestCache::new(config());
        cache.set("/api/users", "alice".to_string(), RequestOptions::new()).await;

        let value = cache
            .get("/API/users", || async { Ok("fetched".to_string()) }, RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(value, "alice");
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.hit_rate, 100.0);
    }

    #[tokio::test]
    async fn test_broken_backend_degrades_to_memory() {
        let cache: RequestCache<u32> = RequestCache::with_parts(
            config(),
            Arc::new(ManualClock::new(0)),
            Some(Arc::new(BrokenBackend)),
        );

        cache.set("a", 1, RequestOptions::new()).await;
        assert!(cache.has("a").await);
        assert!(cache.delete("a").await);
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_corrupted_snapshot_is_ignored() {
        let backend = Arc::new(MemoryBackend::with_bytes(b"{garbage".to_vec()));
        let cache: RequestCache<u32> =
            RequestCache::with_parts(config(), Arc::new(ManualClock::new(0)), Some(backend));

        assert!(cache.keys().await.is_empty());
        cache.set("a", 1, RequestOptions::new()).await;
        assert!(cache.has("a").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_save_on_multi_thread_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = Arc::new(FileBackend::new(dir.path(), "slot"));
        let cache: RequestCache<u32> =
            RequestCache::with_parts(config(), Arc::new(ManualClock::new(0)), Some(backend.clone()));

        cache.set("a", 1, RequestOptions::new()).await;
        let value = cache
            .get("b", || async { Ok(2) }, RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(value, 2);
        let records = decode_snapshot::<u32>(&backend.load().unwrap().unwrap()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_run_blocking_outside_runtime() {
        assert_eq!(run_blocking(|| 7), 7);
    }

    #[tokio::test]
    async fn test_run_blocking_on_current_thread_runtime() {
        assert_eq!(run_blocking(|| 7), 7);
    }

    #[tokio::test]
    async fn test_persistence_disabled_ignores_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let cache: RequestCache<u32> = RequestCache::with_parts(
            CacheConfig {
                enable_persistence: false,
                ..config()
            },
            Arc::new(ManualClock::new(0)),
            Some(backend.clone()),
        );

        cache.set("a", 1, RequestOptions::new()).await;
        assert!(backend.bytes().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_override_uses_default() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: RequestCache<u32> = RequestCache::with_parts(config(), clock.clone(), None);

        cache
            .set("a", 1, RequestOptions::new().ttl(Duration::ZERO))
            .await;
        assert_eq!(cache.entry("a").await.unwrap().ttl, Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_memory_usage_estimate() {
        let cache: RequestCache<String> = RequestCache::new(config());
        cache.set("ab", "xyz".to_string(), RequestOptions::new()).await;

        // "\"xyz\"" is 5 bytes
        assert_eq!(cache.stats().await.memory_usage, 5 * 2 + 2 * 2 + ENTRY_OVERHEAD_BYTES);
    }

    #[tokio::test]
    async fn test_panicking_fetch_clears_in_flight() {
        let cache: RequestCache<u32> = RequestCache::new(config());

        let result = cache
            .get(
                "boom",
                || async {
                    if true {
                        panic!("fetch exploded");
                    }
                    Ok(1)
                },
                RequestOptions::new(),
            )
            .await;

        assert!(matches!(result, Err(CacheError::Fetch { .. })));
        assert!(!cache.is_refreshing("boom").await);
        assert!(!cache.has("boom").await);

        let value = cache
            .get("boom", || async { Ok(2) }, RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(value, 2);
    }
}
