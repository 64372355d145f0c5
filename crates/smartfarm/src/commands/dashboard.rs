//! Dashboard widget handlers.

use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::types::{
    Activity, CropShare, DashboardAlert, DashboardData, DashboardQuery, DashboardTask, Financials, MarketSnapshot,
    MonthOverMonth, Performance, UsageTarget, Weather,
};

use crate::cli::{DashboardArgs, DashboardCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "User")]
    user: String,
}

impl From<&Activity> for ActivityRow {
    fn from(a: &Activity) -> Self {
        Self {
            timestamp: a.timestamp.clone(),
            kind: a.kind.clone(),
            title: a.title.clone(),
            user: output::opt(a.user.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct ShareRow {
    #[tabled(rename = "Crop")]
    crop: String,
    #[tabled(rename = "Area (ha)")]
    area: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&CropShare> for ShareRow {
    fn from(c: &CropShare) -> Self {
        Self {
            crop: c.crop.clone(),
            area: format!("{:.1}", c.area),
            share: format!("{:.1}%", c.percentage),
            status: c.status.clone(),
        }
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
}

impl From<&DashboardTask> for TaskRow {
    fn from(t: &DashboardTask) -> Self {
        Self {
            id: t.id.clone(),
            due: t.due_date.clone(),
            title: t.title.clone(),
            priority: t.priority.clone(),
            status: t.status.clone(),
            assignee: output::opt(t.assigned_to.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Action")]
    action: String,
}

impl From<&DashboardAlert> for AlertRow {
    fn from(a: &DashboardAlert) -> Self {
        Self {
            id: a.id.clone(),
            kind: a.kind.clone(),
            title: a.title.clone(),
            timestamp: a.timestamp.clone(),
            action: if a.action_required { "required" } else { "" }.into(),
        }
    }
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Commodity")]
    commodity: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "24h")]
    change24h: String,
    #[tabled(rename = "7d")]
    change7d: String,
}

impl From<&MarketSnapshot> for SnapshotRow {
    fn from(m: &MarketSnapshot) -> Self {
        Self {
            commodity: m.commodity.clone(),
            price: format!("{:.2}/{}", m.current_price, m.unit),
            change24h: format!("{:+.1}%", m.change24h),
            change7d: format!("{:+.1}%", m.change7d),
        }
    }
}

// ── Detail views ────────────────────────────────────────────────────

fn summary_detail(d: &DashboardData) -> String {
    let mut lines = vec![
        format!("Farmers:      {} ({} active)", d.total_farmers, d.active_farmers),
        format!("Crops:        {} ({} in progress)", d.total_crops, d.crops_in_progress),
        format!("Land area:    {:.1} ha", d.total_land_area),
    ];
    if let Some(w) = &d.weather {
        lines.push(format!("Weather:      {:.1}°C {}", w.temperature, w.condition));
    }
    if let Some(f) = &d.financials {
        lines.push(format!("Profit:       {:.2} ({:+.1}%)", f.profit.current_month, f.profit.percentage));
    }
    lines.push(format!("Open tasks:   {}", d.upcoming_tasks.len()));
    lines.push(format!("Alerts:       {}", d.alerts.len()));
    lines.join("\n")
}

fn month_line(label: &str, m: &MonthOverMonth) -> String {
    format!(
        "{label:<12} {:>12.2}  prev {:>12.2}  {} {:+.1}%",
        m.current_month, m.previous_month, m.trend, m.percentage
    )
}

fn financials_detail(f: &Financials) -> String {
    [
        month_line("Revenue:", &f.revenue),
        month_line("Expenses:", &f.expenses),
        month_line("Profit:", &f.profit),
        format!("Outstanding: {:>12.2}", f.outstanding_payments),
    ]
    .join("\n")
}

fn usage_line(label: &str, u: &UsageTarget) -> String {
    format!("{label:<16} {:.1} / {:.1} {}", u.current, u.target, u.unit)
}

fn performance_detail(p: &Performance) -> String {
    [
        format!("Yield:           {:.2} t/ha", p.yield_per_hectare),
        usage_line("Water:", &p.water_usage),
        usage_line("Fertilizer:", &p.fertilizer_usage),
        format!("Pest incidents:  {}", p.pest_incidents),
        format!("Crop health:     {:.0}%", p.crop_health),
    ]
    .join("\n")
}

fn weather_detail(w: &Weather) -> String {
    let mut lines = vec![
        format!("Now:       {:.1}°C {}", w.temperature, w.condition),
        format!("Humidity:  {:.0}%", w.humidity),
        format!("Wind:      {:.1} km/h", w.wind_speed),
        format!("Rain:      {:.1} mm", w.precipitation),
    ];
    for day in &w.forecast {
        lines.push(format!(
            "  {:<12} {:>5.1} / {:>5.1}  {} ({:.1} mm)",
            day.date, day.high, day.low, day.condition, day.precipitation
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(backend: &Backend, args: DashboardArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = backend.dashboard();
    let query = DashboardQuery {
        start_date: args.start_date,
        end_date: args.end_date,
        region_id: args.region,
        crop_type: args.crop_type,
        ..DashboardQuery::default()
    };

    let out = match args.command {
        DashboardCommand::Summary => {
            let data = dashboard.data(&query).await?;
            output::render_single(&global.output, &*data, summary_detail, |d| d.total_farmers.to_string())
        }

        DashboardCommand::Farmer { farmer_id } => {
            let data = util::require(dashboard.farmer(&farmer_id).await?, "farmer_id")?;
            output::render_single(&global.output, &*data, summary_detail, |d| d.total_crops.to_string())
        }

        DashboardCommand::Activities => {
            let list = dashboard.activities(&query).await?;
            output::render_list(&global.output, list.as_slice(), |a| ActivityRow::from(a), |a| a.id.clone())
        }

        DashboardCommand::Financials => {
            let data = dashboard.financials(&query).await?;
            output::render_single(&global.output, &*data, financials_detail, |f| {
                f.profit.current_month.to_string()
            })
        }

        DashboardCommand::Crops => {
            let list = dashboard.crop_distribution(&query).await?;
            output::render_list(&global.output, list.as_slice(), |c| ShareRow::from(c), |c| c.crop.clone())
        }

        DashboardCommand::Tasks => {
            let list = dashboard.upcoming_tasks(&query).await?;
            output::render_list(&global.output, list.as_slice(), |t| TaskRow::from(t), |t| t.id.clone())
        }

        DashboardCommand::Performance => {
            let data = dashboard.performance(&query).await?;
            output::render_single(&global.output, &*data, performance_detail, |p| {
                p.yield_per_hectare.to_string()
            })
        }

        DashboardCommand::Alerts => {
            let list = dashboard.alerts(&query).await?;
            output::render_list(&global.output, list.as_slice(), |a| AlertRow::from(a), |a| a.id.clone())
        }

        DashboardCommand::Weather => {
            let data = dashboard.weather(&query).await?;
            output::render_single(&global.output, &*data, weather_detail, |w| w.condition.clone())
        }

        DashboardCommand::Market => {
            let list = dashboard.market_overview(&query).await?;
            output::render_list(&global.output, list.as_slice(), |m| SnapshotRow::from(m), |m| {
                m.commodity.clone()
            })
        }

        DashboardCommand::MarkRead { id } => {
            dashboard.mark_alert_read(&id).await?;
            String::new()
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
