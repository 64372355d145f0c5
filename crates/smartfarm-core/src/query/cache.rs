// ── Query cache ──
//
// Keyed, deduplicating read cache. Entries live in a `DashMap`; fetches
// run on their own task and publish into the map when they finish, so a
// reader that gives up never cancels the request for everyone else.

use std::future::Future;
use std::slice;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use indexmap::IndexSet;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::entry::{AnyValue, Entry, EntryState, InFlight, SharedFetch};
use super::key::QueryKey;
use crate::error::CoreError;
use crate::notify::Notifier;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Change notifications published by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fetch (or `set`) stored a new value.
    Updated(QueryKey),
    /// A fetch failed; previous data, if any, is kept.
    Failed(QueryKey),
    Invalidated(QueryKey),
    Removed(QueryKey),
}

/// Shared query cache. Cheap to clone.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: DashMap<QueryKey, Entry>,
    next_fetch_id: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
    notifier: Option<Notifier>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Cache that reports failed fetches as error notifications.
    pub fn with_notifier(notifier: Notifier) -> Self {
        Self::build(Some(notifier))
    }

    fn build(notifier: Option<Notifier>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                next_fetch_id: AtomicU64::new(1),
                events,
                notifier,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Return the cached value if it is still fresh, otherwise fetch.
    ///
    /// Concurrent calls for the same key while a fetch is running all
    /// await that one fetch.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, stale_time: Duration, fetcher: F) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        self.load(key, stale_time, false, fetcher).await
    }

    /// Fetch regardless of freshness (still joins a running fetch).
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, stale_time: Duration, fetcher: F) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        self.load(key, stale_time, true, fetcher).await
    }

    async fn load<T, F, Fut>(&self, key: QueryKey, stale_time: Duration, force: bool, fetcher: F) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let shared = {
            let mut entry = self
                .inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(stale_time));
            entry.stale_time = stale_time;

            if !force && entry.is_fresh(Instant::now()) {
                if let Some(data) = entry.data.clone() {
                    trace!(%key, "cache hit");
                    return downcast(&key, data);
                }
            }

            // A fetch that started before the last invalidation may carry
            // pre-mutation data; later readers get a new one.
            let generation = entry.generation;
            let joinable = entry
                .in_flight
                .as_ref()
                .filter(|running| running.generation == generation)
                .map(|running| running.future.clone());
            if let Some(running) = joinable {
                trace!(%key, "joining in-flight fetch");
                running
            } else {
                if entry.in_flight.is_some() {
                    debug!(%key, "in-flight fetch predates invalidation, starting another");
                }
                let fut = fetcher().map(|result| result.map(|value| Arc::new(value) as AnyValue));
                self.start_fetch(&key, &mut entry, fut)
            }
        };

        let value = shared.await?;
        downcast(&key, value)
    }

    fn start_fetch<Fut>(&self, key: &QueryKey, entry: &mut Entry, fut: Fut) -> SharedFetch
    where
        Fut: Future<Output = Result<AnyValue, CoreError>> + Send + 'static,
    {
        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let started_generation = entry.generation;
        entry.fetch_count += 1;
        debug!(%key, fetch = id, "fetching");

        let cache = self.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = fut.await;
            cache.complete(&task_key, id, started_generation, &result);
            result
        });

        let shared = async move {
            task.await
                .unwrap_or_else(|e| Err(CoreError::Internal(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            id,
            generation: started_generation,
            future: shared.clone(),
        });
        shared
    }

    /// Store a finished fetch. Results for removed (or replaced) entries
    /// are dropped.
    fn complete(&self, key: &QueryKey, id: u64, started_generation: u64, result: &Result<AnyValue, CoreError>) {
        let event = {
            let Some(mut entry) = self.inner.entries.get_mut(key) else {
                debug!(%key, fetch = id, "entry removed while fetching, discarding result");
                return;
            };
            if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
                debug!(%key, fetch = id, "entry replaced while fetching, discarding result");
                return;
            }
            entry.in_flight = None;

            match result {
                Ok(value) => {
                    entry.data = Some(Arc::clone(value));
                    entry.updated_at = Some(Instant::now());
                    entry.error = None;
                    entry.invalidated = entry.generation != started_generation;
                    if entry.invalidated {
                        debug!(%key, "invalidated while fetching, stored as stale");
                    }
                    CacheEvent::Updated(key.clone())
                }
                Err(e) => {
                    entry.error = Some(e.clone());
                    CacheEvent::Failed(key.clone())
                }
            }
        };

        if let (CacheEvent::Failed(_), Err(e), Some(notifier)) = (&event, result, &self.inner.notifier) {
            notifier.error(e.user_message());
        }
        let _ = self.inner.events.send(event);
    }

    /// Cached value for exactly `key`, fresh or not.
    pub fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let data = self.inner.entries.get(key)?.data.clone()?;
        downcast(key, data).ok()
    }

    /// Store a value directly, as if a fetch had just returned it.
    pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        {
            let mut entry = self
                .inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Duration::ZERO));
            entry.data = Some(Arc::new(value));
            entry.updated_at = Some(Instant::now());
            entry.error = None;
            entry.invalidated = false;
        }
        let _ = self.inner.events.send(CacheEvent::Updated(key));
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        let now = Instant::now();
        self.inner.entries.get(key).map(|e| e.snapshot(now))
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<_> = self.inner.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every entry under `prefix` stale. Returns the number marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.invalidate_many(slice::from_ref(prefix))
    }

    /// Mark every entry under any of `prefixes` stale. An entry matched by
    /// several prefixes is still marked once.
    pub fn invalidate_many(&self, prefixes: &[QueryKey]) -> usize {
        let matched = self.matching(prefixes);
        for key in &matched {
            if let Some(mut entry) = self.inner.entries.get_mut(key) {
                entry.invalidate();
            }
        }
        for key in &matched {
            let _ = self.inner.events.send(CacheEvent::Invalidated(key.clone()));
        }
        debug!(count = matched.len(), "invalidated queries");
        matched.len()
    }

    /// Drop every entry under `prefix`. Returns the number removed.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        self.remove_many(slice::from_ref(prefix))
    }

    pub fn remove_many(&self, prefixes: &[QueryKey]) -> usize {
        let matched = self.matching(prefixes);
        let mut removed = 0;
        for key in matched {
            if self.inner.entries.remove(&key).is_some() {
                removed += 1;
                let _ = self.inner.events.send(CacheEvent::Removed(key));
            }
        }
        removed
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    fn matching(&self, prefixes: &[QueryKey]) -> IndexSet<QueryKey> {
        self.inner
            .entries
            .iter()
            .filter(|e| prefixes.iter().any(|p| e.key().starts_with(p)))
            .map(|e| e.key().clone())
            .collect()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: AnyValue) -> Result<Arc<T>, CoreError> {
    value
        .downcast::<T>()
        .map_err(|_| CoreError::Internal(format!("cached value for {key} has an unexpected type")))
}
