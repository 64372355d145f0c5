use std::sync::Arc;
use std::time::Duration;

use smartfarm_api::types::{Farmer, FarmerCreate, FarmerImportResult, FarmerStats, FarmerUpdate, Page};

use super::unexpected;
use crate::command::{Command, CommandResult};
use crate::error::CoreError;
use crate::keys;
use crate::query::QueryKey;
use crate::resource::{Resource, ResourceClient, ResourceSpec, StatsResource};

/// Search is only issued once the query is longer than this.
const MIN_SEARCH_LEN: usize = 2;

pub struct Farmers;

impl Resource for Farmers {
    type Item = Farmer;
    type List = Page<Farmer>;
    type Create = FarmerCreate;
    type Update = FarmerUpdate;

    const SPEC: ResourceSpec = ResourceSpec {
        tag: keys::FARMERS,
        stats_tag: Some(keys::FARMER_STATS),
        path: "farmers",
        label: "Farmer",
        noun: "farmer",
        list_stale: Duration::ZERO,
        item_stale: Duration::ZERO,
        keep_previous_data: true,
    };

    fn validate_create(body: &FarmerCreate) -> Result<(), CoreError> {
        if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "first and last name are required".into(),
            });
        }
        if !body.email.contains('@') {
            return Err(CoreError::Validation {
                message: format!("invalid email address: {}", body.email),
            });
        }
        Ok(())
    }
}

impl StatsResource for Farmers {
    type Stats = FarmerStats;
    const STATS_STALE: Duration = Duration::ZERO;
}

impl ResourceClient<Farmers> {
    /// Free-text search; `Ok(None)` (no request) for queries of two
    /// characters or fewer.
    pub async fn search(&self, query: &str) -> Result<Option<Arc<Vec<Farmer>>>, CoreError> {
        let query = query.trim();
        if query.chars().count() <= MIN_SEARCH_LEN {
            return Ok(None);
        }
        let key = QueryKey::new(keys::FARMER_SEARCH).with(query);
        self.ctx
            .query_with(key, Duration::ZERO, "farmers/search".into(), [("q", query.to_owned())])
            .await
            .map(Some)
    }

    /// Bulk import. Invalidates the farmer lists and stats.
    pub async fn import(&self, farmers: Vec<FarmerCreate>) -> Result<FarmerImportResult, CoreError> {
        match self.ctx.execute(Command::ImportFarmers { farmers }).await? {
            CommandResult::Imported(result) => Ok(result),
            other => Err(unexpected(&other)),
        }
    }
}
