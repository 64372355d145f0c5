// ── Generic resource client ──
//
// Farmers, crops, suppliers, price alerts and scheduled reports all share
// the same list/item/create/update/delete/stats shape. A `Resource`
// implementation describes one of them; `ResourceClient<R>` provides the
// cached reads and invalidating writes for it.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use smartfarm_api::types::ListParams;
use strum::Display;

use crate::context::Context;
use crate::error::CoreError;
use crate::mutation::{CacheEffects, Mutation};
use crate::query::{QueryKey, QueryObserver};

/// Plain CRUD operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MutationOp {
    Create,
    Update,
    Delete,
}

impl MutationOp {
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

/// Static description of a REST resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    /// First query-key segment for lists and items.
    pub tag: &'static str,
    /// Tag of the aggregate stats query, invalidated by every write.
    pub stats_tag: Option<&'static str>,
    /// REST path relative to the API base, e.g. `"farmers"`.
    pub path: &'static str,
    /// Capitalised name for success messages ("Farmer").
    pub label: &'static str,
    /// Lower-case name for failure messages ("farmer").
    pub noun: &'static str,
    pub list_stale: Duration,
    pub item_stale: Duration,
    /// Show the previous page while the next one loads.
    pub keep_previous_data: bool,
}

pub trait Resource: Send + Sync + 'static {
    type Item: DeserializeOwned + Send + Sync + 'static;
    /// List payload: a `Page<Item>` for paginated endpoints, a `Vec` otherwise.
    type List: DeserializeOwned + Send + Sync + 'static;
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;

    const SPEC: ResourceSpec;

    fn create_path(_body: &Self::Create) -> String {
        Self::SPEC.path.to_owned()
    }

    fn validate_create(_body: &Self::Create) -> Result<(), CoreError> {
        Ok(())
    }

    fn success_message(op: MutationOp) -> String {
        format!("{} {} successfully", Self::SPEC.label, op.past_tense())
    }

    /// Failure notification prefix; the server message is appended.
    fn failure_message(op: MutationOp) -> String {
        format!("Failed to {op} {}", Self::SPEC.noun)
    }
}

/// Resources with an aggregate `<path>/stats` endpoint.
pub trait StatsResource: Resource {
    type Stats: DeserializeOwned + Send + Sync + 'static;
    const STATS_STALE: Duration;
}

// ── Client ───────────────────────────────────────────────────────────

pub struct ResourceClient<R> {
    pub(crate) ctx: Arc<Context>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceClient<R> {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            _resource: PhantomData,
        }
    }

    // ── Keys ─────────────────────────────────────────────────────────

    /// Prefix covering every list and item of this resource.
    pub fn collection_key() -> QueryKey {
        QueryKey::new(R::SPEC.tag)
    }

    pub fn list_key(params: &ListParams) -> QueryKey {
        Self::collection_key().with(params)
    }

    pub fn item_key(id: &str) -> QueryKey {
        Self::collection_key().with(id)
    }

    pub fn stats_key() -> Option<QueryKey> {
        R::SPEC.stats_tag.map(QueryKey::new)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn list(&self, params: &ListParams) -> Result<Arc<R::List>, CoreError> {
        self.ctx
            .query_with(
                Self::list_key(params),
                R::SPEC.list_stale,
                R::SPEC.path.to_owned(),
                params.clone(),
            )
            .await
    }

    /// Observer for a paged list view.
    pub fn observe(&self) -> ListView<R> {
        ListView {
            client: self.clone(),
            observer: QueryObserver::new(self.ctx.cache.clone(), R::SPEC.list_stale, R::SPEC.keep_previous_data),
        }
    }

    /// Single entity. An empty id is a disabled query: `Ok(None)`, no request.
    pub async fn item(&self, id: &str) -> Result<Option<Arc<R::Item>>, CoreError> {
        if id.is_empty() {
            return Ok(None);
        }
        self.ctx
            .query(Self::item_key(id), R::SPEC.item_stale, format!("{}/{id}", R::SPEC.path))
            .await
            .map(Some)
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub async fn create(&self, body: &R::Create) -> Result<R::Item, CoreError> {
        R::validate_create(body)?;
        let path = R::create_path(body);
        Self::mutation(MutationOp::Create, Self::write_effects())
            .run(&self.ctx, async {
                self.ctx.api.post::<R::Item, _>(&path, body).await.map_err(CoreError::from)
            })
            .await
    }

    pub async fn update(&self, id: &str, body: &R::Update) -> Result<R::Item, CoreError> {
        require_id(id)?;
        let path = format!("{}/{id}", R::SPEC.path);
        let effects = Self::write_effects().invalidate(Self::item_key(id));
        Self::mutation(MutationOp::Update, effects)
            .run(&self.ctx, async {
                self.ctx.api.put::<R::Item, _>(&path, body).await.map_err(CoreError::from)
            })
            .await
    }

    /// Delete drops the item's cache entry outright.
    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        require_id(id)?;
        let path = format!("{}/{id}", R::SPEC.path);
        let effects = Self::write_effects().remove(Self::item_key(id));
        Self::mutation(MutationOp::Delete, effects)
            .run(&self.ctx, async { self.ctx.api.delete(&path).await.map_err(CoreError::from) })
            .await
    }

    fn write_effects() -> CacheEffects {
        let effects = CacheEffects::new().invalidate(Self::collection_key());
        match Self::stats_key() {
            Some(stats) => effects.invalidate(stats),
            None => effects,
        }
    }

    fn mutation(op: MutationOp, effects: CacheEffects) -> Mutation {
        Mutation::new(effects, R::success_message(op), R::failure_message(op))
    }
}

impl<R: StatsResource> ResourceClient<R> {
    pub async fn stats(&self) -> Result<Arc<R::Stats>, CoreError> {
        let key = Self::stats_key().unwrap_or_else(|| QueryKey::new(R::SPEC.tag).with("stats"));
        self.ctx
            .query(key, R::STATS_STALE, format!("{}/stats", R::SPEC.path))
            .await
    }
}

fn require_id(id: &str) -> Result<(), CoreError> {
    if id.is_empty() {
        return Err(CoreError::Validation {
            message: "an id is required".into(),
        });
    }
    Ok(())
}

// ── List view ────────────────────────────────────────────────────────

/// A list view that follows changing parameters (page, search, filters).
pub struct ListView<R: Resource> {
    client: ResourceClient<R>,
    observer: QueryObserver<R::List>,
}

impl<R: Resource> ListView<R> {
    /// Load `params`, keeping the previous page visible meanwhile if the
    /// resource asks for it.
    pub async fn load(&mut self, params: ListParams) -> Result<Arc<R::List>, CoreError> {
        let api = self.client.ctx.api.clone();
        let key = ResourceClient::<R>::list_key(&params);
        self.observer
            .set_query(key, move || async move {
                api.get_with_params::<R::List, _>(R::SPEC.path, &params)
                    .await
                    .map_err(CoreError::from)
            })
            .await
    }

    pub fn observer(&self) -> &QueryObserver<R::List> {
        &self.observer
    }
}
