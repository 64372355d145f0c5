use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{Extra, StatusCount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CropStatus {
    Planned,
    Planted,
    Growing,
    ReadyForHarvest,
    Harvested,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variety: String,
    pub planting_date: String,
    #[serde(default)]
    pub harvest_date: Option<String>,
    pub status: CropStatus,
    #[serde(default)]
    pub field_id: String,
    #[serde(default)]
    pub field_name: Option<String>,
    /// Hectares.
    #[serde(default)]
    pub area: f64,
    /// Tons.
    #[serde(default)]
    pub expected_yield: f64,
    #[serde(default)]
    pub actual_yield: Option<f64>,
    #[serde(default)]
    pub farmer_id: String,
    #[serde(default)]
    pub farmer_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropCreate {
    pub name: String,
    pub variety: String,
    pub planting_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CropStatus>,
    pub field_id: String,
    pub area: f64,
    pub expected_yield: f64,
    pub farmer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planting_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CropStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropStats {
    pub total_crops: u64,
    #[serde(default)]
    pub crops_by_status: Vec<StatusCount>,
    #[serde(default)]
    pub total_area: f64,
    #[serde(default)]
    pub expected_yield: f64,
    #[serde(default)]
    pub recent_crops: Vec<Crop>,
}

/// `PATCH crops/{id}/status` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropStatusChange {
    pub status: CropStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// `POST crops/{id}/harvest` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRecord {
    pub actual_yield: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CropTaskType {
    Planting,
    Treatment,
    Harvest,
    Inspection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropTask {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CropTaskType,
    pub date: String,
    pub crop_id: String,
    pub crop_name: String,
    #[serde(default)]
    pub field_name: String,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn crop_status_uses_snake_case() {
        let json = serde_json::to_string(&CropStatus::ReadyForHarvest).unwrap();
        assert_eq!(json, "\"ready_for_harvest\"");
        assert_eq!("ready_for_harvest".parse::<CropStatus>().unwrap(), CropStatus::ReadyForHarvest);
    }

    #[test]
    fn crop_keeps_unknown_fields() {
        let crop: Crop = serde_json::from_value(serde_json::json!({
            "id": "c1", "name": "Maize", "plantingDate": "2026-03-01",
            "status": "growing", "soilType": "loam"
        }))
        .unwrap();
        assert_eq!(crop.status, CropStatus::Growing);
        assert_eq!(crop.extra["soilType"], "loam");
    }
}
