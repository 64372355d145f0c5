use std::sync::Arc;
use std::time::Duration;

use smartfarm_api::types::{
    MarketPrice, MarketPriceFilter, MarketStats, PriceAlert, PriceAlertCreate, PriceAlertUpdate,
    PriceHistoryParams, PriceHistoryPoint, PriceTrend, TrendParams,
};

use crate::context::Context;
use crate::error::CoreError;
use crate::keys;
use crate::query::QueryKey;
use crate::resource::{Resource, ResourceClient, ResourceSpec};

const PRICES_STALE: Duration = Duration::from_secs(15 * 60);
const HISTORY_STALE: Duration = Duration::from_secs(30 * 60);
const REFERENCE_DATA_STALE: Duration = Duration::from_secs(24 * 60 * 60);

/// User-defined price alerts. Unpaginated.
pub struct PriceAlerts;

impl Resource for PriceAlerts {
    type Item = PriceAlert;
    type List = Vec<PriceAlert>;
    type Create = PriceAlertCreate;
    type Update = PriceAlertUpdate;

    const SPEC: ResourceSpec = ResourceSpec {
        tag: keys::PRICE_ALERTS,
        stats_tag: None,
        path: "market-prices/alerts",
        label: "Price alert",
        noun: "price alert",
        list_stale: Duration::ZERO,
        item_stale: Duration::ZERO,
        keep_previous_data: false,
    };

    fn validate_create(body: &PriceAlertCreate) -> Result<(), CoreError> {
        if body.commodity.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "commodity is required".into(),
            });
        }
        if !body.value.is_finite() {
            return Err(CoreError::Validation {
                message: "alert value must be a number".into(),
            });
        }
        Ok(())
    }
}

impl ResourceClient<PriceAlerts> {
    /// Every alert of the current user. The endpoint takes no query.
    pub async fn all(&self) -> Result<Arc<Vec<PriceAlert>>, CoreError> {
        self.ctx
            .query(Self::collection_key(), Duration::ZERO, PriceAlerts::SPEC.path.to_owned())
            .await
    }
}

/// Market price reads. Prices move slowly relative to the dashboard, so
/// these carry long freshness windows.
#[derive(Clone)]
pub struct Market {
    ctx: Arc<Context>,
}

impl Market {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub async fn current(&self, filter: &MarketPriceFilter) -> Result<Arc<Vec<MarketPrice>>, CoreError> {
        let key = QueryKey::new(keys::MARKET_PRICES).with(filter);
        self.ctx
            .query_with(key, PRICES_STALE, "market-prices/current".into(), filter.clone())
            .await
    }

    /// Price series for one commodity; `Ok(None)` when none is selected.
    pub async fn history(
        &self,
        commodity: &str,
        params: &PriceHistoryParams,
    ) -> Result<Option<Arc<Vec<PriceHistoryPoint>>>, CoreError> {
        if commodity.is_empty() {
            return Ok(None);
        }
        let key = QueryKey::new(keys::PRICE_HISTORY).with(commodity).with(params);
        self.ctx
            .query_with(
                key,
                HISTORY_STALE,
                format!("market-prices/history/{commodity}"),
                params.clone(),
            )
            .await
            .map(Some)
    }

    pub async fn trends(&self, params: &TrendParams) -> Result<Arc<Vec<PriceTrend>>, CoreError> {
        let key = QueryKey::new(keys::PRICE_TRENDS).with(params);
        self.ctx
            .query_with(key, PRICES_STALE, "market-prices/trends".into(), params.clone())
            .await
    }

    pub async fn stats(&self) -> Result<Arc<MarketStats>, CoreError> {
        self.ctx
            .query(QueryKey::new(keys::MARKET_STATS), PRICES_STALE, "market-prices/stats".into())
            .await
    }

    pub async fn commodities(&self) -> Result<Arc<Vec<String>>, CoreError> {
        self.ctx
            .query(
                QueryKey::new(keys::COMMODITIES),
                REFERENCE_DATA_STALE,
                "market-prices/commodities".into(),
            )
            .await
    }

    pub async fn markets(&self) -> Result<Arc<Vec<String>>, CoreError> {
        self.ctx
            .query(QueryKey::new(keys::MARKETS), REFERENCE_DATA_STALE, "market-prices/markets".into())
            .await
    }

    pub fn alerts(&self) -> ResourceClient<PriceAlerts> {
        ResourceClient::new(Arc::clone(&self.ctx))
    }
}
