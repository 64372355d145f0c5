//! Report command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::domains::Reports;
use smartfarm_core::types::{
    GenerateReportRequest, GeneratedReport, ReportFormat, ReportParameters, ReportStats, ReportTemplate,
    ScheduleReportRequest, ScheduledReport, TemplateQuery,
};

use crate::cli::{GlobalOpts, ReportsArgs, ReportsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

const FORMAT_CHOICES: &str = "pdf, excel, csv, json";

/// How long `--wait` sits on an idle poller before asking again. Queued
/// reports do not keep the poller on its timer.
const WAIT_RECHECK: Duration = Duration::from_secs(5);

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Params")]
    params: usize,
    #[tabled(rename = "System")]
    system: String,
}

impl From<&ReportTemplate> for TemplateRow {
    fn from(t: &ReportTemplate) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            category: t.category.clone(),
            format: t.format.to_string(),
            params: t.parameters.len(),
            system: if t.is_system { "yes" } else { "" }.into(),
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Template")]
    template: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Generated")]
    generated_at: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl From<&GeneratedReport> for ReportRow {
    fn from(r: &GeneratedReport) -> Self {
        Self {
            id: r.id.clone(),
            template: if r.template_name.is_empty() {
                r.template_id.clone()
            } else {
                r.template_name.clone()
            },
            status: r.status.to_string(),
            format: r.format.to_string(),
            generated_at: output::opt(r.generated_at.as_deref()),
            size: output::opt(r.file_size.map(human_size)),
        }
    }
}

#[derive(Tabled)]
struct ScheduledRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Template")]
    template: String,
    #[tabled(rename = "Last run")]
    last_run: String,
    #[tabled(rename = "Next run")]
    next_run: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&ScheduledReport> for ScheduledRow {
    fn from(s: &ScheduledReport) -> Self {
        Self {
            id: s.id.clone(),
            template: if s.template_name.is_empty() {
                s.template_id.clone()
            } else {
                s.template_name.clone()
            },
            last_run: output::opt(s.last_run.as_deref()),
            next_run: output::opt(s.next_run.as_deref()),
            active: if s.active { "yes" } else { "no" }.into(),
        }
    }
}

fn human_size(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

fn report_detail(r: &GeneratedReport) -> String {
    let mut lines = vec![
        format!("ID:        {}", r.id),
        format!("Template:  {} ({})", r.template_name, r.template_id),
        format!("Status:    {}", r.status),
        format!("Format:    {}", r.format),
        format!("Generated: {}", output::opt(r.generated_at.as_deref())),
        format!("Size:      {}", output::opt(r.file_size.map(human_size))),
    ];
    if let Some(err) = &r.error {
        lines.push(format!("Error:     {err}"));
    }
    lines.join("\n")
}

fn stats_detail(s: &ReportStats) -> String {
    let mut lines = vec![format!("Total reports: {}", s.total_reports)];
    for bucket in &s.reports_by_status {
        lines.push(format!("  {:<12} {}", bucket.status, bucket.count));
    }
    if !s.most_popular_templates.is_empty() {
        lines.push("Most used templates:".into());
        for t in &s.most_popular_templates {
            lines.push(format!("  {:<28} {}", t.name, t.count));
        }
    }
    lines.join("\n")
}

/// `KEY=VALUE` template parameters. Values that parse as JSON keep
/// their type, anything else is sent as a string.
fn parse_params(raw: &[String]) -> Result<ReportParameters, CliError> {
    let mut params = ReportParameters::new();
    for entry in raw {
        let (key, value) = util::parse_key_value("param", entry)?;
        let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
        params.insert(key, value);
    }
    Ok(params)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Follow a report until it completes or fails.
async fn wait_for(reports: &Reports, report_id: &str, quiet: bool) -> Result<Arc<GeneratedReport>, CliError> {
    let pb = (!quiet).then(|| spinner(format!("Waiting for report {report_id}")));
    let mut poll = reports.poll_status(report_id);

    let result = loop {
        if let Some(latest) = poll.latest() {
            if let Some(pb) = &pb {
                pb.set_message(format!("Report {report_id}: {}", latest.status));
            }
            if latest.status.is_terminal() {
                break Ok(latest);
            }
        }

        match tokio::time::timeout(WAIT_RECHECK, poll.changed()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                break Err(CliError::Api {
                    status: None,
                    message: format!("stopped following report {report_id}"),
                });
            }
            Err(_) if !poll.is_active() => {
                // Refreshing the cached status wakes the poller once the
                // report reaches processing.
                match reports.status(report_id).await {
                    Ok(Some(report)) if report.status.is_terminal() => break Ok(report),
                    Ok(_) => {}
                    Err(e) => break Err(e.into()),
                }
            }
            Err(_) => {}
        }
    };

    poll.stop().await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(backend: &Backend, args: ReportsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let reports = backend.reports();

    match args.command {
        ReportsCommand::Templates { category, search } => {
            let query = TemplateQuery {
                category,
                search,
                is_system: None,
            };
            let templates = reports.templates(&query).await?;
            let out = output::render_list(&global.output, templates.as_slice(), |t| TemplateRow::from(t), |t| {
                t.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Generate {
            template_id,
            format,
            params,
            email,
            wait,
        } => {
            let request = GenerateReportRequest {
                parameters: parse_params(&params)?,
                format: format
                    .as_deref()
                    .map(|raw| util::parse_choice::<ReportFormat>("format", raw, FORMAT_CHOICES))
                    .transpose()?,
                email_notification: email.then_some(true),
            };
            let started = reports.generate(&template_id, request).await?;

            if !wait {
                let out = output::render_single(
                    &global.output,
                    &started,
                    |s| format!("Report {} {}", s.report_id, s.status),
                    |s| s.report_id.clone(),
                );
                output::print_output(&out, global.quiet);
                return Ok(());
            }

            let report = wait_for(&reports, &started.report_id, global.quiet).await?;
            let out = output::render_single(&global.output, &*report, report_detail, |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Status { id, watch } => {
            let report = if watch {
                wait_for(&reports, &id, global.quiet).await?
            } else {
                util::require(reports.status(&id).await?, "id")?
            };
            let out = output::render_single(&global.output, &*report, report_detail, |r| r.status.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::History(list) => {
            let page = reports.history(&util::list_params(&list)?).await?;
            let out = output::render_list(&global.output, &page.data, |r| ReportRow::from(r), |r| r.id.clone());
            output::print_output(&out, global.quiet);
            output::print_page_footer(&global.output, global.quiet, page.page, page.total_pages, page.total);
            Ok(())
        }

        ReportsCommand::Stats => {
            let stats = reports.stats().await?;
            let out = output::render_single(&global.output, &*stats, stats_detail, |s| {
                s.total_reports.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Download { id, out } => {
            let path = match out {
                Some(path) => path,
                None => {
                    let ext = match reports.status(&id).await {
                        Ok(Some(report)) => report.format.extension(),
                        _ => "bin",
                    };
                    PathBuf::from(format!("report-{id}.{ext}"))
                }
            };
            let bytes = reports.download(&id).await?;
            std::fs::write(&path, &bytes)?;
            if !global.quiet {
                eprintln!("Saved {} to {}", human_size(u64::try_from(bytes.len()).unwrap_or(u64::MAX)), path.display());
            }
            Ok(())
        }

        ReportsCommand::Schedule(payload) => {
            let request: ScheduleReportRequest = util::read_json_file(&payload.from_file)?;
            let scheduled = reports.schedule(&request).await?;
            let out = output::render_single(
                &global.output,
                &scheduled,
                |s| format!("Scheduled {} ({}), next run {}", s.id, s.template_id, output::opt(s.next_run.as_deref())),
                |s| s.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Scheduled => {
            let list = reports.scheduled().await?;
            let out = output::render_list(&global.output, list.as_slice(), |s| ScheduledRow::from(s), |s| {
                s.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Unschedule { id } => {
            if !util::confirm(&format!("Delete scheduled report {id}?"), global.yes)? {
                return Ok(());
            }
            reports.delete_scheduled(&id).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn params_keep_json_types() {
        let params = parse_params(&["year=2024".into(), "region=north".into(), "crops=[\"maize\"]".into()]).unwrap();
        assert_eq!(params["year"], serde_json::json!(2024));
        assert_eq!(params["region"], serde_json::json!("north"));
        assert_eq!(params["crops"], serde_json::json!(["maize"]));
    }

    #[test]
    fn params_reject_missing_key() {
        assert!(parse_params(&["=oops".into()]).is_err());
    }
}
