// ── Conditional polling ──
//
// Refetches a query on an interval chosen from its latest data. When the
// interval function returns `None` the poller goes idle; it wakes up again
// if some other write puts data under the key that asks for polling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cache::{CacheEvent, QueryCache};
use super::key::QueryKey;
use crate::error::CoreError;

/// Handle to a running poller. Dropping it stops polling.
pub struct PollHandle<T> {
    data_rx: watch::Receiver<Option<Arc<T>>>,
    active_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T> PollHandle<T> {
    /// Most recent data seen by the poller.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.data_rx.borrow().clone()
    }

    /// Wait for the next value. Returns `None` once the poller has ended.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.data_rx.changed().await.ok()?;
        self.data_rx.borrow_and_update().clone()
    }

    /// `true` while the poller is on a timer, `false` while idle.
    pub fn is_active(&self) -> bool {
        *self.active_rx.borrow()
    }

    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start polling `key`.
///
/// `interval` is evaluated after every fetch: `Some(d)` schedules the next
/// fetch after `d`, `None` stops the timer. A failed fetch decides from the
/// data still cached under the key. `stale_time` is the key's usual
/// freshness window and is kept on the entry.
pub fn poll<T, F, Fut, I>(
    cache: &QueryCache,
    key: QueryKey,
    stale_time: Duration,
    fetcher: F,
    interval: I,
) -> PollHandle<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    I: Fn(&T) -> Option<Duration> + Send + 'static,
{
    let (data_tx, data_rx) = watch::channel(cache.get::<T>(&key));
    let (active_tx, active_rx) = watch::channel(true);
    let cancel = CancellationToken::new();

    let poller = Poller {
        cache: cache.clone(),
        events: cache.subscribe(),
        key,
        stale_time,
        fetcher,
        interval,
        data_tx,
        active_tx,
    };
    let task = tokio::spawn(poller.run(cancel.clone()));

    PollHandle {
        data_rx,
        active_rx,
        cancel,
        task: Some(task),
    }
}

struct Poller<T, F, I> {
    cache: QueryCache,
    events: broadcast::Receiver<CacheEvent>,
    key: QueryKey,
    stale_time: Duration,
    fetcher: F,
    interval: I,
    data_tx: watch::Sender<Option<Arc<T>>>,
    active_tx: watch::Sender<bool>,
}

impl<T, F, Fut, I> Poller<T, F, I>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    I: Fn(&T) -> Option<Duration> + Send + 'static,
{
    async fn run(mut self, cancel: CancellationToken) {
        loop {
            let latest = match self.cache.refetch(self.key.clone(), self.stale_time, &self.fetcher).await {
                Ok(data) => Some(data),
                Err(e) => {
                    debug!(key = %self.key, error = %e, "poll fetch failed");
                    self.cache.get::<T>(&self.key)
                }
            };
            if let Some(data) = &latest {
                self.data_tx.send_replace(Some(Arc::clone(data)));
            }

            let next = match latest.as_deref().and_then(&self.interval) {
                Some(delay) => delay,
                None => {
                    self.active_tx.send_replace(false);
                    debug!(key = %self.key, "polling paused");
                    match self.idle(&cancel).await {
                        Some(delay) => delay,
                        None => return,
                    }
                }
            };
            self.active_tx.send_replace(true);

            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(next) => {}
            }
        }
    }

    /// Wait until the key is written with data that wants polling again.
    async fn idle(&mut self, cancel: &CancellationToken) -> Option<Duration> {
        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                event = self.events.recv() => event,
            };
            match event {
                Ok(CacheEvent::Updated(key)) if key == self.key => {
                    let Some(data) = self.cache.get::<T>(&self.key) else {
                        continue;
                    };
                    self.data_tx.send_replace(Some(Arc::clone(&data)));
                    if let Some(delay) = (self.interval)(&data) {
                        debug!(key = %self.key, "polling resumed");
                        return Some(delay);
                    }
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
