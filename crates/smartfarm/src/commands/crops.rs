//! Crop command handlers.

use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::types::{Crop, CropCreate, CropStats, CropStatus, CropTask, CropUpdate};

use crate::cli::{CropsArgs, CropsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

const STATUS_CHOICES: &str = "planned, planted, growing, ready_for_harvest, harvested, failed";

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct CropRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Variety")]
    variety: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Area (ha)")]
    area: String,
    #[tabled(rename = "Planted")]
    planted: String,
    #[tabled(rename = "Farmer")]
    farmer: String,
}

impl From<&Crop> for CropRow {
    fn from(c: &Crop) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            variety: c.variety.clone(),
            status: c.status.to_string(),
            area: format!("{:.1}", c.area),
            planted: c.planting_date.clone(),
            farmer: c.farmer_name.clone().unwrap_or_else(|| c.farmer_id.clone()),
        }
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Crop")]
    crop: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&CropTask> for TaskRow {
    fn from(t: &CropTask) -> Self {
        Self {
            date: t.date.clone(),
            kind: t.kind.to_string(),
            crop: t.crop_name.clone(),
            field: t.field_name.clone(),
            status: t.status.clone(),
        }
    }
}

fn detail(c: &Crop) -> String {
    [
        format!("ID:             {}", c.id),
        format!("Name:           {}", c.name),
        format!("Variety:        {}", c.variety),
        format!("Status:         {}", c.status),
        format!("Field:          {}", c.field_name.as_deref().unwrap_or(&c.field_id)),
        format!("Farmer:         {}", c.farmer_name.as_deref().unwrap_or(&c.farmer_id)),
        format!("Area:           {:.1} ha", c.area),
        format!("Planted:        {}", c.planting_date),
        format!("Harvest:        {}", output::opt(c.harvest_date.as_deref())),
        format!("Expected yield: {:.1} t", c.expected_yield),
        format!("Actual yield:   {}", output::opt(c.actual_yield.map(|y| format!("{y:.1} t")))),
    ]
    .join("\n")
}

fn stats_detail(s: &CropStats) -> String {
    let mut lines = vec![
        format!("Total crops:    {}", s.total_crops),
        format!("Total area:     {:.1} ha", s.total_area),
        format!("Expected yield: {:.1} t", s.expected_yield),
    ];
    for bucket in &s.crops_by_status {
        lines.push(format!("  {:<18} {}", bucket.status, bucket.count));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(backend: &Backend, args: CropsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let crops = backend.crops();

    match args.command {
        CropsCommand::List(list) => {
            let page = crops.list(&util::list_params(&list)?).await?;
            let out = output::render_list(&global.output, &page.data, |c| CropRow::from(c), |c| c.id.clone());
            output::print_output(&out, global.quiet);
            output::print_page_footer(&global.output, global.quiet, page.page, page.total_pages, page.total);
            Ok(())
        }

        CropsCommand::Get { id } => {
            let crop = util::require(crops.item(&id).await?, "id")?;
            let out = output::render_single(&global.output, &*crop, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::Create(payload) => {
            let body: CropCreate = util::read_json_file(&payload.from_file)?;
            let created = crops.create(&body).await?;
            let out = output::render_single(&global.output, &created, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::Update { id, payload } => {
            let body: CropUpdate = util::read_json_file(&payload.from_file)?;
            let updated = crops.update(&id, &body).await?;
            let out = output::render_single(&global.output, &updated, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete crop {id}?"), global.yes)? {
                return Ok(());
            }
            crops.delete(&id).await?;
            Ok(())
        }

        CropsCommand::Stats => {
            let stats = crops.stats().await?;
            let out = output::render_single(&global.output, &*stats, stats_detail, |s| s.total_crops.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::Status { id, status, notes } => {
            let status: CropStatus = util::parse_choice("status", &status, STATUS_CHOICES)?;
            let crop = crops.update_status(&id, status, notes).await?;
            let out = output::render_single(&global.output, &crop, detail, |c| c.status.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::Harvest {
            id,
            actual_yield,
            notes,
        } => {
            if !actual_yield.is_finite() || actual_yield < 0.0 {
                return Err(CliError::Validation {
                    field: "yield".into(),
                    reason: "must be a non-negative number".into(),
                });
            }
            let crop = crops.record_harvest(&id, actual_yield, notes).await?;
            let out = output::render_single(&global.output, &crop, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::Tasks { days } => {
            let tasks = crops.upcoming_tasks(days).await?;
            let out = output::render_list(&global.output, tasks.as_slice(), |t| TaskRow::from(t), |t| t.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::ForFarmer { farmer_id } => {
            let list = util::require(crops.for_farmer(&farmer_id).await?, "farmer_id")?;
            let out = output::render_list(&global.output, list.as_slice(), |c| CropRow::from(c), |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CropsCommand::ForField { field_id } => {
            let list = util::require(crops.for_field(&field_id).await?, "field_id")?;
            let out = output::render_list(&global.output, list.as_slice(), |c| CropRow::from(c), |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
