use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use smartfarm_api::types::{
    GenerateReportRequest, GenerateReportResponse, GeneratedReport, ListParams, Page, ReportStats,
    ReportStatus, ReportTemplate, ScheduleReportRequest, ScheduledReport, ScheduledReportUpdate,
    TemplateQuery,
};

use super::unexpected;
use crate::command::{Command, CommandResult};
use crate::context::Context;
use crate::error::CoreError;
use crate::keys;
use crate::query::{self, PollHandle, QueryKey, QueryObserver};
use crate::resource::{MutationOp, Resource, ResourceClient, ResourceSpec};

/// Status refetch interval while a report is being generated.
pub const REPORT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const REPORT_STATS_STALE: Duration = Duration::from_secs(15 * 60);

/// Recurring report schedules.
pub struct ScheduledReports;

impl Resource for ScheduledReports {
    type Item = ScheduledReport;
    type List = Vec<ScheduledReport>;
    type Create = ScheduleReportRequest;
    type Update = ScheduledReportUpdate;

    const SPEC: ResourceSpec = ResourceSpec {
        tag: keys::SCHEDULED_REPORTS,
        stats_tag: None,
        path: "reports/scheduled",
        label: "Scheduled report",
        noun: "scheduled report",
        list_stale: Duration::ZERO,
        item_stale: Duration::ZERO,
        keep_previous_data: false,
    };

    fn create_path(body: &ScheduleReportRequest) -> String {
        format!("reports/schedule/{}", body.template_id)
    }

    fn validate_create(body: &ScheduleReportRequest) -> Result<(), CoreError> {
        if body.template_id.is_empty() {
            return Err(CoreError::Validation {
                message: "a report template is required".into(),
            });
        }
        if !is_clock_time(&body.schedule.time) {
            return Err(CoreError::Validation {
                message: format!("schedule time must be HH:MM, got {:?}", body.schedule.time),
            });
        }
        Ok(())
    }

    fn success_message(op: MutationOp) -> String {
        match op {
            MutationOp::Create => "Report scheduled successfully".into(),
            _ => format!("{} {} successfully", Self::SPEC.label, op.past_tense()),
        }
    }

    fn failure_message(op: MutationOp) -> String {
        match op {
            MutationOp::Create => "Failed to schedule report".into(),
            _ => format!("Failed to {op} {}", Self::SPEC.noun),
        }
    }
}

fn is_clock_time(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    let two_digits = |p: &str| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit());
    two_digits(h)
        && two_digits(m)
        && h.parse::<u8>().is_ok_and(|h| h < 24)
        && m.parse::<u8>().is_ok_and(|m| m < 60)
}

/// Report templates, generation, history and schedules.
#[derive(Clone)]
pub struct Reports {
    ctx: Arc<Context>,
}

impl Reports {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    // ── Templates ────────────────────────────────────────────────────

    pub async fn templates(&self, query: &TemplateQuery) -> Result<Arc<Vec<ReportTemplate>>, CoreError> {
        let key = QueryKey::new(keys::REPORT_TEMPLATES).with(query);
        self.ctx
            .query_with(key, Duration::ZERO, "reports/templates".into(), query.clone())
            .await
    }

    pub async fn template(&self, id: &str) -> Result<Option<Arc<ReportTemplate>>, CoreError> {
        if id.is_empty() {
            return Ok(None);
        }
        self.ctx
            .query(
                QueryKey::new(keys::REPORT_TEMPLATES).with(id),
                Duration::ZERO,
                format!("reports/templates/{id}"),
            )
            .await
            .map(Some)
    }

    // ── Generation ───────────────────────────────────────────────────

    /// Queue a report. The returned id feeds `status` / `poll_status`.
    pub async fn generate(
        &self,
        template_id: &str,
        request: GenerateReportRequest,
    ) -> Result<GenerateReportResponse, CoreError> {
        if template_id.is_empty() {
            return Err(CoreError::Validation {
                message: "a report template is required".into(),
            });
        }
        let cmd = Command::GenerateReport {
            template_id: template_id.to_owned(),
            request,
        };
        match self.ctx.execute(cmd).await? {
            CommandResult::ReportStarted(started) => Ok(started),
            other => Err(unexpected(&other)),
        }
    }

    fn status_key(report_id: &str) -> QueryKey {
        QueryKey::new(keys::REPORT_HISTORY).with(report_id)
    }

    pub async fn status(&self, report_id: &str) -> Result<Option<Arc<GeneratedReport>>, CoreError> {
        if report_id.is_empty() {
            return Ok(None);
        }
        self.ctx
            .query(
                Self::status_key(report_id),
                Duration::ZERO,
                format!("reports/{report_id}/status"),
            )
            .await
            .map(Some)
    }

    /// Refetch the status every [`REPORT_POLL_INTERVAL`] while the report
    /// is processing. The poller idles once it settles and wakes again if
    /// a later read finds it processing.
    pub fn poll_status(&self, report_id: &str) -> PollHandle<GeneratedReport> {
        let api = self.ctx.api.clone();
        let path = format!("reports/{report_id}/status");
        query::poll(
            &self.ctx.cache,
            Self::status_key(report_id),
            Duration::ZERO,
            move || {
                let api = api.clone();
                let path = path.clone();
                async move { api.get::<GeneratedReport>(&path).await.map_err(CoreError::from) }
            },
            |report: &GeneratedReport| (report.status == ReportStatus::Processing).then_some(REPORT_POLL_INTERVAL),
        )
    }

    // ── History ──────────────────────────────────────────────────────

    pub async fn history(&self, params: &ListParams) -> Result<Arc<Page<GeneratedReport>>, CoreError> {
        let key = QueryKey::new(keys::REPORT_HISTORY).with(params);
        self.ctx
            .query_with(key, Duration::ZERO, "reports/history".into(), params.clone())
            .await
    }

    /// Observer for the paged history view; keeps the previous page
    /// visible while the next one loads.
    pub fn observe_history(&self) -> HistoryView {
        HistoryView {
            api: self.ctx.api.clone(),
            observer: QueryObserver::new(self.ctx.cache.clone(), Duration::ZERO, true),
        }
    }

    pub async fn stats(&self) -> Result<Arc<ReportStats>, CoreError> {
        self.ctx
            .query(QueryKey::new(keys::REPORT_STATS), REPORT_STATS_STALE, "reports/stats".into())
            .await
    }

    /// Raw report file. Never cached.
    pub async fn download(&self, report_id: &str) -> Result<Bytes, CoreError> {
        if report_id.is_empty() {
            return Err(CoreError::Validation {
                message: "a report id is required".into(),
            });
        }
        match self.ctx.api.get_bytes(&format!("reports/{report_id}/download")).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                let err = CoreError::from(e);
                self.ctx
                    .notifier
                    .error(format!("Failed to download report: {}", err.user_message()));
                Err(err)
            }
        }
    }

    // ── Schedules ────────────────────────────────────────────────────

    fn schedules(&self) -> ResourceClient<ScheduledReports> {
        ResourceClient::new(Arc::clone(&self.ctx))
    }

    pub async fn schedule(&self, request: &ScheduleReportRequest) -> Result<ScheduledReport, CoreError> {
        self.schedules().create(request).await
    }

    pub async fn scheduled(&self) -> Result<Arc<Vec<ScheduledReport>>, CoreError> {
        self.ctx
            .query(
                ResourceClient::<ScheduledReports>::collection_key(),
                Duration::ZERO,
                ScheduledReports::SPEC.path.to_owned(),
            )
            .await
    }

    pub async fn update_scheduled(
        &self,
        id: &str,
        update: &ScheduledReportUpdate,
    ) -> Result<ScheduledReport, CoreError> {
        self.schedules().update(id, update).await
    }

    pub async fn delete_scheduled(&self, id: &str) -> Result<(), CoreError> {
        self.schedules().delete(id).await
    }
}

/// Paged report history that follows changing parameters.
pub struct HistoryView {
    api: smartfarm_api::ApiClient,
    observer: QueryObserver<Page<GeneratedReport>>,
}

impl HistoryView {
    pub async fn load(&mut self, params: ListParams) -> Result<Arc<Page<GeneratedReport>>, CoreError> {
        let api = self.api.clone();
        let key = QueryKey::new(keys::REPORT_HISTORY).with(&params);
        self.observer
            .set_query(key, move || async move {
                api.get_with_params::<Page<GeneratedReport>, _>("reports/history", &params)
                    .await
                    .map_err(CoreError::from)
            })
            .await
    }

    pub fn observer(&self) -> &QueryObserver<Page<GeneratedReport>> {
        &self.observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_accepts_24h_only() {
        assert!(is_clock_time("06:30"));
        assert!(is_clock_time("23:59"));
        assert!(!is_clock_time("24:00"));
        assert!(!is_clock_time("6:30"));
        assert!(!is_clock_time("06-30"));
    }

    #[test]
    fn schedule_messages() {
        assert_eq!(
            ScheduledReports::success_message(MutationOp::Create),
            "Report scheduled successfully"
        );
        assert_eq!(
            ScheduledReports::success_message(MutationOp::Update),
            "Scheduled report updated successfully"
        );
        assert_eq!(
            ScheduledReports::failure_message(MutationOp::Delete),
            "Failed to delete scheduled report"
        );
        assert_eq!(
            ScheduledReports::failure_message(MutationOp::Create),
            "Failed to schedule report"
        );
    }
}
