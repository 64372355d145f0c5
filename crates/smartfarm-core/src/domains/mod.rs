// ── Domain clients ──
//
// One module per backend area. Plain CRUD resources are `Resource`
// markers driven through `ResourceClient`; the rest are thin structs over
// the shared `Context`.

mod crops;
mod dashboard;
mod farmers;
mod market;
mod recommendations;
mod reports;
mod suppliers;

pub use crops::Crops;
pub use dashboard::Dashboard;
pub use farmers::Farmers;
pub use market::{Market, PriceAlerts};
pub use recommendations::Recommendations;
pub use reports::{HistoryView, REPORT_POLL_INTERVAL, Reports, ScheduledReports};
pub use suppliers::Suppliers;

use crate::command::CommandResult;
use crate::error::CoreError;

pub(crate) fn unexpected(result: &CommandResult) -> CoreError {
    CoreError::Internal(format!("unexpected command result: {result:?}"))
}
