//! Recommendation command handlers.

use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::types::{
    GenerateRecommendationsRequest, Recommendation, RecommendationCreate, RecommendationEntity,
    RecommendationStats, RecommendationStatus, RecommendationType, RecommendationUpdate,
};

use crate::cli::{GlobalOpts, RecommendationsArgs, RecommendationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

const STATUS_CHOICES: &str = "pending, in_progress, completed, dismissed";
const TYPE_CHOICES: &str = "crop_planning, pest_control, irrigation, fertilization, harvest, market";
const ENTITY_CHOICES: &str = "crop, field, farmer, inventory, market";

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Related")]
    related: String,
    #[tabled(rename = "Due")]
    due: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(r: &Recommendation) -> Self {
        Self {
            id: r.id.clone(),
            kind: r.kind.to_string(),
            title: r.title.clone(),
            priority: r.priority.to_string(),
            status: r.status.to_string(),
            related: related(r),
            due: output::opt(r.due_date.as_deref()),
        }
    }
}

fn related(r: &Recommendation) -> String {
    match (&r.related_entity_type, &r.related_entity_name, &r.related_entity_id) {
        (Some(kind), Some(name), _) => format!("{kind}: {name}"),
        (Some(kind), None, Some(id)) => format!("{kind}: {id}"),
        _ => "-".into(),
    }
}

fn detail(r: &Recommendation) -> String {
    let mut lines = vec![
        format!("ID:          {}", r.id),
        format!("Title:       {}", r.title),
        format!("Type:        {}", r.kind),
        format!("Priority:    {}", r.priority),
        format!("Status:      {}", r.status),
        format!("Related:     {}", related(r)),
        format!("Due:         {}", output::opt(r.due_date.as_deref())),
        format!("Completed:   {}", output::opt(r.completed_at.as_deref())),
    ];
    if !r.description.is_empty() {
        lines.push(String::new());
        lines.push(r.description.clone());
    }
    if let Some(notes) = &r.notes {
        lines.push(format!("Notes:       {notes}"));
    }
    lines.join("\n")
}

fn stats_detail(s: &RecommendationStats) -> String {
    let mut lines = vec![format!("Total: {}", s.total)];
    for bucket in &s.by_status {
        lines.push(format!("  {:<14} {}", bucket.status, bucket.count));
    }
    for bucket in &s.by_priority {
        lines.push(format!("  {:<14} {}", bucket.priority, bucket.count));
    }
    for bucket in &s.by_type {
        lines.push(format!("  {:<14} {}", bucket.kind, bucket.count));
    }
    lines.join("\n")
}

pub async fn handle(backend: &Backend, args: RecommendationsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let recs = backend.recommendations();

    match args.command {
        RecommendationsCommand::List(list) => {
            let page = recs.list(&util::list_params(&list)?).await?;
            let out = output::render_list(&global.output, &page.data, |r| RecommendationRow::from(r), |r| r.id.clone());
            output::print_output(&out, global.quiet);
            output::print_page_footer(&global.output, global.quiet, page.page, page.total_pages, page.total);
            Ok(())
        }

        RecommendationsCommand::Get { id } => {
            let rec = util::require(recs.item(&id).await?, "id")?;
            let out = output::render_single(&global.output, &*rec, detail, |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::Create(payload) => {
            let body: RecommendationCreate = util::read_json_file(&payload.from_file)?;
            let created = recs.create(&body).await?;
            let out = output::render_single(&global.output, &created, detail, |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::Update { id, payload } => {
            let body: RecommendationUpdate = util::read_json_file(&payload.from_file)?;
            let updated = recs.update(&id, &body).await?;
            let out = output::render_single(&global.output, &updated, detail, |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete recommendation {id}?"), global.yes)? {
                return Ok(());
            }
            recs.delete(&id).await?;
            Ok(())
        }

        RecommendationsCommand::Stats => {
            let stats = recs.stats().await?;
            let out = output::render_single(&global.output, &*stats, stats_detail, |s| s.total.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::Status { id, status, notes } => {
            let status: RecommendationStatus = util::parse_choice("status", &status, STATUS_CHOICES)?;
            let rec = recs.update_status(&id, status, notes).await?;
            let out = output::render_single(&global.output, &rec, detail, |r| r.status.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::Generate { kind, entity, entity_id } => {
            let request = GenerateRecommendationsRequest {
                kind: kind
                    .map(|k| util::parse_choice::<RecommendationType>("type", &k, TYPE_CHOICES))
                    .transpose()?,
                entity_type: entity
                    .map(|e| util::parse_choice::<RecommendationEntity>("entity", &e, ENTITY_CHOICES))
                    .transpose()?,
                entity_id,
                context: None,
            };
            let response = recs.generate(request).await?;
            let out = output::render_list(
                &global.output,
                &response.recommendations,
                |r| RecommendationRow::from(r),
                |r| r.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::Similar { id } => {
            let list = util::require(recs.similar(&id).await?, "id")?;
            let out = output::render_list(&global.output, list.as_slice(), |r| RecommendationRow::from(r), |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RecommendationsCommand::For { entity, entity_id } => {
            let entity: RecommendationEntity = util::parse_choice("entity", &entity, ENTITY_CHOICES)?;
            let list = util::require(recs.for_entity(entity, &entity_id).await?, "entity_id")?;
            let out = output::render_list(&global.output, list.as_slice(), |r| RecommendationRow::from(r), |r| r.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
