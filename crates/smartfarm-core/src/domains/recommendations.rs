use std::sync::Arc;
use std::time::Duration;

use smartfarm_api::types::{
    GenerateRecommendationsRequest, GenerateRecommendationsResponse, Page, Recommendation,
    RecommendationCreate, RecommendationEntity, RecommendationStats, RecommendationStatus,
    RecommendationStatusChange, RecommendationUpdate,
};

use super::unexpected;
use crate::command::{Command, CommandResult};
use crate::error::CoreError;
use crate::keys;
use crate::query::QueryKey;
use crate::resource::{Resource, ResourceClient, ResourceSpec, StatsResource};

pub struct Recommendations;

impl Resource for Recommendations {
    type Item = Recommendation;
    type List = Page<Recommendation>;
    type Create = RecommendationCreate;
    type Update = RecommendationUpdate;

    const SPEC: ResourceSpec = ResourceSpec {
        tag: keys::RECOMMENDATIONS,
        stats_tag: Some(keys::RECOMMENDATION_STATS),
        path: "recommendations",
        label: "Recommendation",
        noun: "recommendation",
        list_stale: Duration::ZERO,
        item_stale: Duration::ZERO,
        keep_previous_data: true,
    };

    fn validate_create(body: &RecommendationCreate) -> Result<(), CoreError> {
        if body.title.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "recommendation title is required".into(),
            });
        }
        Ok(())
    }
}

impl StatsResource for Recommendations {
    type Stats = RecommendationStats;
    const STATS_STALE: Duration = Duration::ZERO;
}

impl ResourceClient<Recommendations> {
    pub async fn update_status(
        &self,
        id: &str,
        status: RecommendationStatus,
        notes: Option<String>,
    ) -> Result<Recommendation, CoreError> {
        let cmd = Command::UpdateRecommendationStatus {
            recommendation_id: id.to_owned(),
            change: RecommendationStatusChange { status, notes },
        };
        match self.ctx.execute(cmd).await? {
            CommandResult::Recommendation(rec) => Ok(*rec),
            other => Err(unexpected(&other)),
        }
    }

    /// Ask the backend to generate new recommendations. Invalidates the
    /// lists and stats.
    pub async fn generate(
        &self,
        request: GenerateRecommendationsRequest,
    ) -> Result<GenerateRecommendationsResponse, CoreError> {
        match self.ctx.execute(Command::GenerateRecommendations { request }).await? {
            CommandResult::Generated(response) => Ok(response),
            other => Err(unexpected(&other)),
        }
    }

    /// Recommendations similar to `id`. Empty id: `Ok(None)`, no request.
    pub async fn similar(&self, id: &str) -> Result<Option<Arc<Vec<Recommendation>>>, CoreError> {
        if id.is_empty() {
            return Ok(None);
        }
        let key = Self::item_key(id).with(keys::SIMILAR);
        self.ctx
            .query(key, Duration::ZERO, format!("recommendations/{id}/similar"))
            .await
            .map(Some)
    }

    /// Recommendations attached to one entity, keyed
    /// `[entity, id, "recommendations"]`.
    pub async fn for_entity(
        &self,
        entity: RecommendationEntity,
        entity_id: &str,
    ) -> Result<Option<Arc<Vec<Recommendation>>>, CoreError> {
        if entity_id.is_empty() {
            return Ok(None);
        }
        let key = Self::entity_key(entity, entity_id);
        self.ctx
            .query(key, Duration::ZERO, format!("{entity}/{entity_id}/recommendations"))
            .await
            .map(Some)
    }

    pub fn entity_key(entity: RecommendationEntity, entity_id: &str) -> QueryKey {
        QueryKey::new(entity.to_string())
            .with(entity_id)
            .with(keys::RECOMMENDATIONS)
    }
}
