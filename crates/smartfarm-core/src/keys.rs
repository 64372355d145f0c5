// ── Query key tags ──
//
// Every cached query starts with one of these tags. Mutations and the
// realtime bridge invalidate by tag, so the names live in one place.

pub const FARMERS: &str = "farmers";
pub const FARMER_STATS: &str = "farmer-stats";
pub const FARMER_SEARCH: &str = "search-farmers";
pub const FARMER_DASHBOARD: &str = "farmer-dashboard";

pub const CROPS: &str = "crops";
pub const CROP_STATS: &str = "crop-stats";
pub const CROP_TASKS: &str = "crop-tasks";

pub const SUPPLIERS: &str = "suppliers";
pub const SUPPLIER_STATS: &str = "supplier-stats";
/// Third key segment for a supplier's products: `[suppliers, id, "products"]`.
pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";

pub const MARKET_PRICES: &str = "market-prices";
pub const PRICE_HISTORY: &str = "price-history";
pub const PRICE_TRENDS: &str = "price-trends";
pub const PRICE_ALERTS: &str = "price-alerts";
pub const MARKET_STATS: &str = "market-stats";
pub const COMMODITIES: &str = "commodities";
pub const MARKETS: &str = "markets";

pub const REPORT_TEMPLATES: &str = "report-templates";
/// Report history lists and per-report status share this tag.
pub const REPORT_HISTORY: &str = "report-history";
pub const REPORT_STATS: &str = "report-stats";
pub const SCHEDULED_REPORTS: &str = "scheduled-reports";

pub const RECOMMENDATIONS: &str = "recommendations";
pub const RECOMMENDATION_STATS: &str = "recommendation-stats";
/// Trailing segment of `[recommendations, id, "similar"]`.
pub const SIMILAR: &str = "similar";

pub const DASHBOARD_DATA: &str = "dashboard-data";
pub const RECENT_ACTIVITIES: &str = "recent-activities";
pub const FINANCIAL_OVERVIEW: &str = "financial-overview";
pub const CROP_DISTRIBUTION: &str = "crop-distribution";
pub const UPCOMING_TASKS: &str = "upcoming-tasks";
pub const PERFORMANCE_METRICS: &str = "performance-metrics";
pub const ALERTS: &str = "alerts";
pub const WEATHER_FORECAST: &str = "weather-forecast";
pub const MARKET_PRICES_OVERVIEW: &str = "market-prices-overview";
