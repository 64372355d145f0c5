//! Farmer command handlers.

use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::types::{Farmer, FarmerCreate, FarmerStats, FarmerUpdate};

use crate::cli::{FarmersArgs, FarmersCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FarmerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Farm (ha)")]
    farm_size: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Farmer> for FarmerRow {
    fn from(f: &Farmer) -> Self {
        Self {
            id: f.id.clone(),
            name: f.full_name(),
            email: f.email.clone(),
            city: f.city.clone(),
            farm_size: format!("{:.1}", f.farm_size),
            status: f.status.to_string(),
        }
    }
}

fn detail(f: &Farmer) -> String {
    [
        format!("ID:        {}", f.id),
        format!("Name:      {}", f.full_name()),
        format!("Email:     {}", f.email),
        format!("Phone:     {}", f.phone),
        format!("Address:   {}, {} {} {}", f.address, f.city, f.state, f.zip_code),
        format!("Farm size: {:.1} ha", f.farm_size),
        format!("Crops:     {}", f.crops.join(", ")),
        format!("Status:    {}", f.status),
        format!("Joined:    {}", output::opt(f.join_date.as_deref())),
        format!("Notes:     {}", output::opt(f.notes.as_deref())),
    ]
    .join("\n")
}

fn stats_detail(s: &FarmerStats) -> String {
    let mut lines = vec![
        format!("Total farmers:   {}", s.total_farmers),
        format!("Active farmers:  {}", s.active_farmers),
        format!("Total farm size: {:.1} ha", s.total_farm_size),
    ];
    for bucket in &s.farmers_by_status {
        lines.push(format!("  {:<14} {}", bucket.status, bucket.count));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(backend: &Backend, args: FarmersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let farmers = backend.farmers();

    match args.command {
        FarmersCommand::List(list) => {
            let page = farmers.list(&util::list_params(&list)?).await?;
            let out = output::render_list(&global.output, &page.data, |f| FarmerRow::from(f), |f| f.id.clone());
            output::print_output(&out, global.quiet);
            output::print_page_footer(&global.output, global.quiet, page.page, page.total_pages, page.total);
            Ok(())
        }

        FarmersCommand::Get { id } => {
            let farmer = util::require(farmers.item(&id).await?, "id")?;
            let out = output::render_single(&global.output, &*farmer, detail, |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FarmersCommand::Create {
            first_name,
            last_name,
            email,
            phone,
            city,
            farm_size,
            from_file,
        } => {
            let body = if let Some(ref path) = from_file {
                util::read_json_file::<FarmerCreate>(path)?
            } else {
                FarmerCreate {
                    first_name: first_name.unwrap_or_default(),
                    last_name: last_name.unwrap_or_default(),
                    email: email.unwrap_or_default(),
                    phone: phone.unwrap_or_default(),
                    address: String::new(),
                    city: city.unwrap_or_default(),
                    state: String::new(),
                    zip_code: String::new(),
                    farm_size: farm_size.unwrap_or_default(),
                    crops: Vec::new(),
                    status: None,
                    notes: None,
                }
            };
            let created = farmers.create(&body).await?;
            let out = output::render_single(&global.output, &created, detail, |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FarmersCommand::Update { id, payload } => {
            let body: FarmerUpdate = util::read_json_file(&payload.from_file)?;
            let updated = farmers.update(&id, &body).await?;
            let out = output::render_single(&global.output, &updated, detail, |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FarmersCommand::Delete { id } => {
            if !util::confirm(&format!("Delete farmer {id}?"), global.yes)? {
                return Ok(());
            }
            farmers.delete(&id).await?;
            Ok(())
        }

        FarmersCommand::Search { query } => {
            let Some(found) = farmers.search(&query).await? else {
                return Err(CliError::Validation {
                    field: "query".into(),
                    reason: "search needs more than two characters".into(),
                });
            };
            let out = output::render_list(&global.output, found.as_slice(), |f| FarmerRow::from(f), |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FarmersCommand::Stats => {
            let stats = farmers.stats().await?;
            let out = output::render_single(&global.output, &*stats, stats_detail, |s| {
                s.total_farmers.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FarmersCommand::Import { path } => {
            let batch: Vec<FarmerCreate> = util::read_json_file(&path)?;
            let result = farmers.import(batch).await?;
            let out = output::render_single(
                &global.output,
                &result,
                |r| format!("Imported: {}\nErrors:   {}", r.imported, r.errors.len()),
                |r| r.imported.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
