use std::sync::Arc;
use std::time::Duration;

use smartfarm_api::types::{
    Crop, CropCreate, CropStats, CropStatus, CropStatusChange, CropTask, CropUpdate, HarvestRecord, Page,
};

use super::unexpected;
use crate::command::{Command, CommandResult};
use crate::error::CoreError;
use crate::keys;
use crate::query::QueryKey;
use crate::resource::{Resource, ResourceClient, ResourceSpec, StatsResource};

pub struct Crops;

impl Resource for Crops {
    type Item = Crop;
    type List = Page<Crop>;
    type Create = CropCreate;
    type Update = CropUpdate;

    const SPEC: ResourceSpec = ResourceSpec {
        tag: keys::CROPS,
        stats_tag: Some(keys::CROP_STATS),
        path: "crops",
        label: "Crop",
        noun: "crop",
        list_stale: Duration::ZERO,
        item_stale: Duration::ZERO,
        keep_previous_data: true,
    };

    fn validate_create(body: &CropCreate) -> Result<(), CoreError> {
        if body.name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "crop name is required".into(),
            });
        }
        if body.area <= 0.0 || !body.area.is_finite() {
            return Err(CoreError::Validation {
                message: "area must be a positive number".into(),
            });
        }
        Ok(())
    }
}

impl StatsResource for Crops {
    type Stats = CropStats;
    const STATS_STALE: Duration = Duration::ZERO;
}

impl ResourceClient<Crops> {
    pub async fn update_status(&self, id: &str, status: CropStatus, notes: Option<String>) -> Result<Crop, CoreError> {
        let cmd = Command::UpdateCropStatus {
            crop_id: id.to_owned(),
            change: CropStatusChange { status, notes },
        };
        self.run_crop_command(cmd).await
    }

    pub async fn record_harvest(&self, id: &str, actual_yield: f64, notes: Option<String>) -> Result<Crop, CoreError> {
        let cmd = Command::RecordHarvest {
            crop_id: id.to_owned(),
            record: HarvestRecord { actual_yield, notes },
        };
        self.run_crop_command(cmd).await
    }

    /// Planting, harvest and maintenance tasks due in the next `days` days.
    pub async fn upcoming_tasks(&self, days: u32) -> Result<Arc<Vec<CropTask>>, CoreError> {
        let key = QueryKey::new(keys::CROP_TASKS).with(days);
        self.ctx
            .query_with(key, Duration::ZERO, "crops/upcoming-tasks".into(), [("days", days)])
            .await
    }

    /// Crops owned by one farmer. Cached under the crops prefix so crop
    /// writes invalidate it.
    pub async fn for_farmer(&self, farmer_id: &str) -> Result<Option<Arc<Vec<Crop>>>, CoreError> {
        if farmer_id.is_empty() {
            return Ok(None);
        }
        let key = QueryKey::new(keys::CROPS).with("by-farmer").with(farmer_id);
        self.ctx
            .query(key, Duration::ZERO, format!("farmers/{farmer_id}/crops"))
            .await
            .map(Some)
    }

    pub async fn for_field(&self, field_id: &str) -> Result<Option<Arc<Vec<Crop>>>, CoreError> {
        if field_id.is_empty() {
            return Ok(None);
        }
        let key = QueryKey::new(keys::CROPS).with("by-field").with(field_id);
        self.ctx
            .query(key, Duration::ZERO, format!("fields/{field_id}/crops"))
            .await
            .map(Some)
    }

    async fn run_crop_command(&self, cmd: Command) -> Result<Crop, CoreError> {
        match self.ctx.execute(cmd).await? {
            CommandResult::Crop(crop) => Ok(*crop),
            other => Err(unexpected(&other)),
        }
    }
}
