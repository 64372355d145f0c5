use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use smartfarm_api::types::{
    Activity, CropShare, DashboardAlert, DashboardData, DashboardQuery, DashboardTask, Financials,
    MarketSnapshot, Performance, Weather,
};

use crate::command::Command;
use crate::context::Context;
use crate::error::CoreError;
use crate::keys;
use crate::query::QueryKey;

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Overview widgets. Each widget is its own query so they refresh on
/// independent schedules.
#[derive(Clone)]
pub struct Dashboard {
    ctx: Arc<Context>,
}

impl Dashboard {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    async fn widget<T>(
        &self,
        tag: &'static str,
        stale_time: Duration,
        path: &str,
        query: &DashboardQuery,
    ) -> Result<Arc<T>, CoreError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = QueryKey::new(tag).with(query);
        self.ctx
            .query_with(key, stale_time, path.to_owned(), query.clone())
            .await
    }

    pub async fn data(&self, query: &DashboardQuery) -> Result<Arc<DashboardData>, CoreError> {
        self.widget(keys::DASHBOARD_DATA, minutes(1), "dashboard", query).await
    }

    /// Per-farmer overview; `Ok(None)` for an empty id.
    pub async fn farmer(&self, farmer_id: &str) -> Result<Option<Arc<DashboardData>>, CoreError> {
        if farmer_id.is_empty() {
            return Ok(None);
        }
        self.ctx
            .query(
                QueryKey::new(keys::FARMER_DASHBOARD).with(farmer_id),
                minutes(1),
                format!("dashboard/farmers/{farmer_id}"),
            )
            .await
            .map(Some)
    }

    pub async fn activities(&self, query: &DashboardQuery) -> Result<Arc<Vec<Activity>>, CoreError> {
        self.widget(keys::RECENT_ACTIVITIES, minutes(5), "dashboard/activities", query)
            .await
    }

    pub async fn financials(&self, query: &DashboardQuery) -> Result<Arc<Financials>, CoreError> {
        self.widget(keys::FINANCIAL_OVERVIEW, minutes(15), "dashboard/financials", query)
            .await
    }

    pub async fn crop_distribution(&self, query: &DashboardQuery) -> Result<Arc<Vec<CropShare>>, CoreError> {
        self.widget(keys::CROP_DISTRIBUTION, minutes(30), "dashboard/crop-distribution", query)
            .await
    }

    pub async fn upcoming_tasks(&self, query: &DashboardQuery) -> Result<Arc<Vec<DashboardTask>>, CoreError> {
        self.widget(keys::UPCOMING_TASKS, minutes(5), "dashboard/upcoming-tasks", query)
            .await
    }

    pub async fn performance(&self, query: &DashboardQuery) -> Result<Arc<Performance>, CoreError> {
        self.widget(keys::PERFORMANCE_METRICS, minutes(15), "dashboard/performance", query)
            .await
    }

    pub async fn alerts(&self, query: &DashboardQuery) -> Result<Arc<Vec<DashboardAlert>>, CoreError> {
        self.widget(keys::ALERTS, minutes(5), "dashboard/alerts", query).await
    }

    pub async fn weather(&self, query: &DashboardQuery) -> Result<Arc<Weather>, CoreError> {
        self.widget(keys::WEATHER_FORECAST, minutes(30), "dashboard/weather", query)
            .await
    }

    pub async fn market_overview(&self, query: &DashboardQuery) -> Result<Arc<Vec<MarketSnapshot>>, CoreError> {
        self.widget(keys::MARKET_PRICES_OVERVIEW, minutes(15), "dashboard/market-prices", query)
            .await
    }

    /// Invalidates the alert list and the aggregate dashboard.
    pub async fn mark_alert_read(&self, alert_id: &str) -> Result<(), CoreError> {
        if alert_id.is_empty() {
            return Err(CoreError::Validation {
                message: "an alert id is required".into(),
            });
        }
        let cmd = Command::MarkAlertRead {
            alert_id: alert_id.to_owned(),
        };
        self.ctx.execute(cmd).await.map(|_| ())
    }
}
