// ── Query observer ──
//
// Follows one query whose key changes over time (pagination, search
// terms, filters) and publishes what a view should render.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::cache::QueryCache;
use super::entry::QueryStatus;
use super::key::QueryKey;
use crate::error::CoreError;

/// What a view shows for an observed query.
#[derive(Debug)]
pub struct QueryResult<T> {
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    /// `data` belongs to the previous key while the current one loads.
    pub is_previous_data: bool,
    pub error: Option<CoreError>,
}

// Manual impl: `T` itself need not be `Clone`.
impl<T> Clone for QueryResult<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            is_previous_data: self.is_previous_data,
            error: self.error.clone(),
        }
    }
}

impl<T> QueryResult<T> {
    fn empty() -> Self {
        Self {
            data: None,
            status: QueryStatus::Empty,
            is_previous_data: false,
            error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}

pub struct QueryObserver<T> {
    cache: QueryCache,
    stale_time: Duration,
    keep_previous_data: bool,
    current: Option<QueryKey>,
    tx: watch::Sender<QueryResult<T>>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub fn new(cache: QueryCache, stale_time: Duration, keep_previous_data: bool) -> Self {
        let (tx, _) = watch::channel(QueryResult::empty());
        Self {
            cache,
            stale_time,
            keep_previous_data,
            current: None,
            tx,
        }
    }

    pub fn key(&self) -> Option<&QueryKey> {
        self.current.as_ref()
    }

    /// Point the observer at `key` and load it.
    ///
    /// With `keep_previous_data`, the last shown data stays visible
    /// (flagged `is_previous_data`) until the new key resolves, unless the
    /// cache already holds something for the new key.
    pub async fn set_query<F, Fut>(&mut self, key: QueryKey, fetcher: F) -> Result<Arc<T>, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let previous = self.tx.borrow().data.clone();
        let key_changed = self.current.as_ref() != Some(&key);
        self.current = Some(key.clone());

        let cached = self.cache.get::<T>(&key);
        let (placeholder, is_previous_data) = match cached {
            Some(data) => (Some(data), false),
            None if self.keep_previous_data || !key_changed => (previous.clone(), key_changed),
            None => (None, false),
        };
        self.tx.send_replace(QueryResult {
            data: placeholder.clone(),
            status: QueryStatus::Loading,
            is_previous_data,
            error: None,
        });

        let result = self.cache.fetch(key.clone(), self.stale_time, fetcher).await;
        match &result {
            Ok(data) => {
                // Just loaded, so fresh even with a zero stale time, unless
                // an invalidation landed while the fetch ran.
                let invalidated = self.cache.state(&key).is_some_and(|s| s.is_invalidated);
                let status = if invalidated {
                    QueryStatus::Stale
                } else {
                    QueryStatus::Fresh
                };
                self.tx.send_replace(QueryResult {
                    data: Some(Arc::clone(data)),
                    status,
                    is_previous_data: false,
                    error: None,
                });
            }
            Err(e) => {
                self.tx.send_replace(QueryResult {
                    data: placeholder,
                    status: QueryStatus::Error,
                    is_previous_data,
                    error: Some(e.clone()),
                });
            }
        }
        result
    }

    pub fn result(&self) -> QueryResult<T> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryResult<T>> {
        self.tx.subscribe()
    }

    pub fn stream(&self) -> WatchStream<QueryResult<T>> {
        WatchStream::new(self.tx.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(n: u32) -> QueryKey {
        QueryKey::new("farmers").with(serde_json::json!({ "page": n }))
    }

    fn ready(value: u32) -> impl FnOnce() -> futures_util::future::Ready<Result<u32, CoreError>> {
        move || futures_util::future::ready(Ok(value))
    }

    #[tokio::test]
    async fn keeps_previous_page_while_next_loads() {
        let cache = QueryCache::new();
        let mut observer = QueryObserver::<u32>::new(cache.clone(), Duration::ZERO, true);
        let mut rx = observer.subscribe();

        observer.set_query(page(1), ready(1)).await.unwrap();
        let _ = rx.borrow_and_update();

        let gate = Arc::new(tokio::sync::Notify::new());
        let release = Arc::clone(&gate);
        let mut load = Box::pin(observer.set_query(page(2), move || async move {
            release.notified().await;
            Ok(2)
        }));

        // Drive until the loading placeholder is published.
        tokio::select! {
            _ = &mut load => panic!("page 2 resolved before release"),
            _ = rx.changed() => {}
        }
        {
            let shown = rx.borrow_and_update();
            assert!(shown.is_loading());
            assert!(shown.is_previous_data);
            assert_eq!(shown.data.as_deref(), Some(&1));
        }

        gate.notify_one();
        assert_eq!(*load.await.unwrap(), 2);
        let shown = observer.result();
        assert!(!shown.is_previous_data);
        assert_eq!(shown.data.as_deref(), Some(&2));
        assert_eq!(shown.status, QueryStatus::Fresh);
    }

    #[tokio::test]
    async fn zero_stale_load_is_fresh_unless_invalidated_meanwhile() {
        let cache = QueryCache::new();
        let mut observer = QueryObserver::<u32>::new(cache.clone(), Duration::ZERO, true);

        observer.set_query(page(1), ready(1)).await.unwrap();
        assert_eq!(observer.result().status, QueryStatus::Fresh);

        let invalidating = cache.clone();
        observer
            .set_query(page(2), move || async move {
                invalidating.invalidate(&QueryKey::new("farmers"));
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(observer.result().status, QueryStatus::Stale);
    }

    #[tokio::test]
    async fn without_keep_previous_data_shows_nothing_while_loading() {
        let cache = QueryCache::new();
        let mut observer = QueryObserver::<u32>::new(cache, Duration::ZERO, false);
        let mut rx = observer.subscribe();

        observer.set_query(page(1), ready(1)).await.unwrap();
        let _ = rx.borrow_and_update();

        let gate = Arc::new(tokio::sync::Notify::new());
        let release = Arc::clone(&gate);
        let mut load = Box::pin(observer.set_query(page(2), move || async move {
            release.notified().await;
            Ok(2)
        }));
        tokio::select! {
            _ = &mut load => panic!("page 2 resolved before release"),
            _ = rx.changed() => {}
        }
        assert!(rx.borrow_and_update().data.is_none());
        gate.notify_one();
        load.await.unwrap();
    }

    #[tokio::test]
    async fn cached_data_for_new_key_is_not_previous() {
        let cache = QueryCache::new();
        cache.set(page(2), 22_u32);
        let mut observer = QueryObserver::<u32>::new(cache, Duration::ZERO, true);

        observer.set_query(page(1), ready(1)).await.unwrap();
        let mut rx = observer.subscribe();
        let result = observer.set_query(page(2), ready(2)).await.unwrap();

        assert_eq!(*result, 2);
        assert!(!observer.result().is_previous_data);
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn failure_keeps_placeholder_and_reports_error() {
        let cache = QueryCache::new();
        let mut observer = QueryObserver::<u32>::new(cache, Duration::ZERO, true);
        observer.set_query(page(1), ready(1)).await.unwrap();

        let err = observer
            .set_query(page(2), || async { Err(CoreError::SessionExpired) })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::SessionExpired));
        let shown = observer.result();
        assert_eq!(shown.status, QueryStatus::Error);
        assert_eq!(shown.data.as_deref(), Some(&1));
        assert!(shown.is_previous_data);
    }
}
