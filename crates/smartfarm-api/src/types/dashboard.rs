use serde::{Deserialize, Serialize};

use super::Extra;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub high: f64,
    pub low: f64,
    pub condition: String,
    #[serde(default)]
    pub precipitation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub temperature: f64,
    pub condition: String,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub precipitation: f64,
    #[serde(default)]
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropShare {
    pub crop: String,
    pub area: f64,
    pub percentage: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthOverMonth {
    pub current_month: f64,
    pub previous_month: f64,
    pub trend: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub revenue: MonthOverMonth,
    pub expenses: MonthOverMonth,
    pub profit: MonthOverMonth,
    #[serde(default)]
    pub outstanding_payments: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub commodity: String,
    pub current_price: f64,
    #[serde(default)]
    pub change24h: f64,
    #[serde(default)]
    pub change7d: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTask {
    pub id: String,
    pub title: String,
    pub due_date: String,
    pub priority: String,
    pub status: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub action_required: bool,
    #[serde(default)]
    pub action_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageTarget {
    pub current: f64,
    pub target: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub yield_per_hectare: f64,
    pub water_usage: UsageTarget,
    pub fertilizer_usage: UsageTarget,
    #[serde(default)]
    pub pest_incidents: u64,
    /// 0-100.
    #[serde(default)]
    pub crop_health: f64,
}

/// Aggregate payload of `GET dashboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_farmers: u64,
    pub active_farmers: u64,
    pub total_crops: u64,
    pub crops_in_progress: u64,
    /// Hectares.
    pub total_land_area: f64,
    #[serde(default)]
    pub recent_activities: Vec<Activity>,
    #[serde(default)]
    pub weather: Option<Weather>,
    #[serde(default)]
    pub crop_distribution: Vec<CropShare>,
    #[serde(default)]
    pub financials: Option<Financials>,
    #[serde(default)]
    pub market_prices: Vec<MarketSnapshot>,
    #[serde(default)]
    pub upcoming_tasks: Vec<DashboardTask>,
    #[serde(default)]
    pub alerts: Vec<DashboardAlert>,
    #[serde(default)]
    pub performance: Option<Performance>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Shared query for the dashboard sub-endpoints: date range, region,
/// crop type and endpoint-specific keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    #[serde(flatten)]
    pub extra: std::collections::BTreeMap<String, String>,
}

impl DashboardQuery {
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }
}
