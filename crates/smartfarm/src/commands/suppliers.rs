//! Supplier command handlers.

use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::types::{
    Supplier, SupplierCreate, SupplierOrder, SupplierProduct, SupplierProductInput, SupplierStats,
    SupplierUpdate,
};

use crate::cli::{GlobalOpts, SuppliersArgs, SuppliersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SupplierRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Contact")]
    contact: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Supplier> for SupplierRow {
    fn from(s: &Supplier) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            kind: s.kind.to_string(),
            contact: s.contact_person.clone(),
            city: s.city.clone(),
            rating: output::opt(s.rating.map(|r| format!("{r:.1}"))),
            status: s.status.to_string(),
        }
    }
}

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Lead (days)")]
    lead_time: String,
}

impl From<&SupplierProduct> for ProductRow {
    fn from(p: &SupplierProduct) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            category: p.category.clone(),
            price: format!("{:.2} {}/{}", p.price, p.currency, p.unit),
            lead_time: output::opt(p.lead_time_days),
        }
    }
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "Order")]
    number: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Delivery")]
    delivery: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl From<&SupplierOrder> for OrderRow {
    fn from(o: &SupplierOrder) -> Self {
        Self {
            number: o.order_number.clone(),
            date: o.order_date.clone(),
            delivery: output::opt(o.expected_delivery_date.as_deref()),
            status: o.status.clone(),
            total: format!("{:.2} {}", o.total_amount, o.currency),
        }
    }
}

fn detail(s: &Supplier) -> String {
    let mut lines = vec![
        format!("ID:            {}", s.id),
        format!("Name:          {}", s.name),
        format!("Type:          {}", s.kind),
        format!("Status:        {}", s.status),
        format!("Contact:       {} <{}> {}", s.contact_person, s.email, s.phone),
        format!("Location:      {}, {}", s.city, s.country),
        format!("Rating:        {}", output::opt(s.rating)),
        format!("Payment terms: {}", output::opt(s.payment_terms.as_deref())),
        format!("Lead time:     {}", output::opt(s.lead_time_days.map(|d| format!("{d} days")))),
    ];
    if !s.products.is_empty() {
        lines.push(format!("Products:      {}", s.products.len()));
    }
    lines.join("\n")
}

fn stats_detail(s: &SupplierStats) -> String {
    let mut lines = vec![format!("Total suppliers: {}", s.total_suppliers)];
    for bucket in &s.suppliers_by_type {
        lines.push(format!("  {:<12} {}", bucket.kind, bucket.count));
    }
    if !s.top_suppliers.is_empty() {
        lines.push("Top suppliers:".into());
        for top in &s.top_suppliers {
            lines.push(format!("  {:<24} {:>4} orders  {:.2}", top.name, top.order_count, top.total_spent));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(backend: &Backend, args: SuppliersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let suppliers = backend.suppliers();

    match args.command {
        SuppliersCommand::List(list) => {
            let page = suppliers.list(&util::list_params(&list)?).await?;
            let out = output::render_list(&global.output, &page.data, |s| SupplierRow::from(s), |s| s.id.clone());
            output::print_output(&out, global.quiet);
            output::print_page_footer(&global.output, global.quiet, page.page, page.total_pages, page.total);
            Ok(())
        }

        SuppliersCommand::Get { id } => {
            let supplier = util::require(suppliers.item(&id).await?, "id")?;
            let out = output::render_single(&global.output, &*supplier, detail, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::Create(payload) => {
            let body: SupplierCreate = util::read_json_file(&payload.from_file)?;
            let created = suppliers.create(&body).await?;
            let out = output::render_single(&global.output, &created, detail, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::Update { id, payload } => {
            let body: SupplierUpdate = util::read_json_file(&payload.from_file)?;
            let updated = suppliers.update(&id, &body).await?;
            let out = output::render_single(&global.output, &updated, detail, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::Delete { id } => {
            if !util::confirm(&format!("Delete supplier {id}?"), global.yes)? {
                return Ok(());
            }
            suppliers.delete(&id).await?;
            Ok(())
        }

        SuppliersCommand::Search { query } => {
            let found = util::require(suppliers.search(&query).await?, "query")?;
            let out = output::render_list(&global.output, found.as_slice(), |s| SupplierRow::from(s), |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::Stats => {
            let stats = suppliers.stats().await?;
            let out = output::render_single(&global.output, &*stats, stats_detail, |s| {
                s.total_suppliers.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::Products { id } => {
            let products = util::require(suppliers.products(&id).await?, "id")?;
            let out = output::render_list(&global.output, products.as_slice(), |p| ProductRow::from(p), |p| p.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::AddProduct { id, payload } => {
            let product: SupplierProductInput = util::read_json_file(&payload.from_file)?;
            let added = suppliers.add_product(&id, product).await?;
            let out = output::render_single(
                &global.output,
                &added,
                |p| format!("Added {} ({}) to supplier {id}", p.name, p.id),
                |p| p.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::UpdateProduct { id, product_id, payload } => {
            let product: SupplierProductInput = util::read_json_file(&payload.from_file)?;
            let updated = suppliers.update_product(&id, &product_id, product).await?;
            let out = output::render_single(
                &global.output,
                &updated,
                |p| format!("Updated {} ({})", p.name, p.id),
                |p| p.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SuppliersCommand::RemoveProduct { id, product_id } => {
            if !util::confirm(&format!("Remove product {product_id} from supplier {id}?"), global.yes)? {
                return Ok(());
            }
            suppliers.remove_product(&id, &product_id).await?;
            Ok(())
        }

        SuppliersCommand::Orders { id, list } => {
            let page = util::require(suppliers.orders(&id, &util::list_params(&list)?).await?, "id")?;
            let out = output::render_list(&global.output, &page.data, |o| OrderRow::from(o), |o| o.id.clone());
            output::print_output(&out, global.quiet);
            output::print_page_footer(&global.output, global.quiet, page.page, page.total_pages, page.total);
            Ok(())
        }
    }
}
