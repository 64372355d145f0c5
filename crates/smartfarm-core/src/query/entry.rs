// ── Cache entry bookkeeping ──

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use tokio::time::Instant;

use crate::error::CoreError;

/// Type-erased cached value. Each key always holds the same concrete type.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// One fetch, awaited by every reader that arrives while it runs.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<AnyValue, CoreError>>>;

/// Lifecycle of a cache entry.
///
/// `Empty → Loading → Fresh → Stale → Loading → Fresh …`; `Error` is
/// reachable from `Loading` and the next read leaves it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum QueryStatus {
    Empty,
    Loading,
    Fresh,
    Stale,
    Error,
}

pub(crate) struct InFlight {
    pub(crate) id: u64,
    /// Entry generation when the fetch started.
    pub(crate) generation: u64,
    pub(crate) future: SharedFetch,
}

pub(crate) struct Entry {
    pub(crate) data: Option<AnyValue>,
    pub(crate) updated_at: Option<Instant>,
    pub(crate) error: Option<CoreError>,
    pub(crate) stale_time: Duration,
    pub(crate) invalidated: bool,
    /// Bumped on every invalidation; a fetch that started under an older
    /// generation lands as stale.
    pub(crate) generation: u64,
    pub(crate) fetch_count: u64,
    pub(crate) invalidation_count: u64,
    pub(crate) in_flight: Option<InFlight>,
}

impl Entry {
    pub(crate) fn new(stale_time: Duration) -> Self {
        Self {
            data: None,
            updated_at: None,
            error: None,
            stale_time,
            invalidated: false,
            generation: 0,
            fetch_count: 0,
            invalidation_count: 0,
            in_flight: None,
        }
    }

    pub(crate) fn is_fresh(&self, now: Instant) -> bool {
        if self.data.is_none() || self.error.is_some() || self.invalidated {
            return false;
        }
        self.updated_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.stale_time)
    }

    pub(crate) fn status(&self, now: Instant) -> QueryStatus {
        if self.in_flight.is_some() {
            QueryStatus::Loading
        } else if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.is_none() {
            QueryStatus::Empty
        } else if self.is_fresh(now) {
            QueryStatus::Fresh
        } else {
            QueryStatus::Stale
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.invalidated = true;
        self.generation += 1;
        self.invalidation_count += 1;
    }

    pub(crate) fn snapshot(&self, now: Instant) -> EntryState {
        EntryState {
            status: self.status(now),
            updated_at: self.updated_at,
            is_invalidated: self.invalidated,
            fetch_count: self.fetch_count,
            invalidation_count: self.invalidation_count,
            error: self.error.clone(),
        }
    }
}

/// Point-in-time view of an entry's bookkeeping.
#[derive(Debug, Clone)]
pub struct EntryState {
    pub status: QueryStatus,
    pub updated_at: Option<Instant>,
    pub is_invalidated: bool,
    /// Fetches started for this key.
    pub fetch_count: u64,
    pub invalidation_count: u64,
    pub error: Option<CoreError>,
}
