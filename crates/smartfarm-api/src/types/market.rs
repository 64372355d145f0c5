use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{Extra, SortOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub id: String,
    pub commodity: String,
    #[serde(default)]
    pub variety: Option<String>,
    pub unit: String,
    pub price: f64,
    pub market: String,
    pub date: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub change24h: Option<f64>,
    #[serde(default)]
    pub change7d: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub currency: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Query for `market-prices/current`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPriceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HistoryInterval {
    Day,
    Week,
    Month,
}

/// Query for `market-prices/history/{commodity}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<HistoryInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub date: String,
    pub price: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Query for `market-prices/trends`. Lists are sent comma-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrendParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markets: Option<String>,
}

impl TrendParams {
    pub fn for_commodities<S: AsRef<str>>(commodities: &[S], days: Option<u32>) -> Self {
        let joined = commodities
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            commodities: (!joined.is_empty()).then_some(joined),
            days,
            markets: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTrend {
    pub commodity: String,
    #[serde(default)]
    pub data: Vec<TrendPoint>,
    pub current_price: f64,
    #[serde(default)]
    pub change24h: f64,
    #[serde(default)]
    pub change7d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PriceAlertCondition {
    Above,
    Below,
    Change,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: String,
    pub commodity: String,
    pub condition: PriceAlertCondition,
    pub value: f64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub last_triggered: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertCreate {
    pub commodity: String,
    pub condition: PriceAlertCondition,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<PriceAlertCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub commodity: String,
    pub current_price: f64,
    #[serde(default)]
    pub change24h: f64,
    #[serde(default)]
    pub change7d: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceMover {
    pub commodity: String,
    pub change: f64,
    pub current_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub total_commodities: u64,
    pub total_markets: u64,
    #[serde(default)]
    pub price_changes: Vec<PriceChange>,
    #[serde(default)]
    pub top_gainers: Vec<PriceMover>,
    #[serde(default)]
    pub top_losers: Vec<PriceMover>,
}
