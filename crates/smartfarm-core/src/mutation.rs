// ── Mutations ──
//
// A mutation is one REST call plus the cache keys it makes stale. The
// effects are applied only after the backend confirms success; a failed
// call leaves the cache untouched and reports the server's message.

use std::future::Future;

use tracing::debug;

use crate::context::Context;
use crate::error::CoreError;
use crate::query::{QueryCache, QueryKey};

/// Cache keys touched by a successful mutation.
///
/// Keys are prefixes: invalidating `[farmers]` marks every farmers list
/// and item stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEffects {
    pub invalidate: Vec<QueryKey>,
    pub remove: Vec<QueryKey>,
}

impl CacheEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(mut self, key: QueryKey) -> Self {
        self.invalidate.push(key);
        self
    }

    pub fn remove(mut self, key: QueryKey) -> Self {
        self.remove.push(key);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.invalidate.is_empty() && self.remove.is_empty()
    }

    /// Removals run first so a deleted item is dropped, not marked stale.
    pub fn apply(&self, cache: &QueryCache) {
        let removed = cache.remove_many(&self.remove);
        let invalidated = cache.invalidate_many(&self.invalidate);
        debug!(removed, invalidated, "applied mutation effects");
    }
}

/// A mutation ready to run: effects plus the messages to show.
#[derive(Debug, Clone)]
pub(crate) struct Mutation {
    pub effects: CacheEffects,
    pub success: String,
    /// Prefix of the failure notification, e.g. "Failed to create farmer".
    pub failure: String,
}

impl Mutation {
    pub(crate) fn new(effects: CacheEffects, success: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            effects,
            success: success.into(),
            failure: failure.into(),
        }
    }

    pub(crate) async fn run<T, Fut>(self, ctx: &Context, call: Fut) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, CoreError>>,
    {
        match call.await {
            Ok(value) => {
                self.effects.apply(&ctx.cache);
                ctx.notifier.success(self.success);
                Ok(value)
            }
            Err(e) => {
                ctx.notifier
                    .error(format!("{}: {}", self.failure, e.user_message()));
                Err(e)
            }
        }
    }
}
