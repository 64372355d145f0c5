//! Market price and price-alert command handlers.

use tabled::Tabled;

use smartfarm_core::Backend;
use smartfarm_core::types::{
    HistoryInterval, MarketPrice, MarketPriceFilter, MarketStats, PriceAlert, PriceAlertCondition,
    PriceAlertCreate, PriceAlertUpdate, PriceHistoryParams, PriceHistoryPoint, PriceTrend, TrendParams,
};

use crate::cli::{AlertsCommand, GlobalOpts, PricesArgs, PricesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

const INTERVAL_CHOICES: &str = "day, week, month";
const CONDITION_CHOICES: &str = "above, below, change";

// ── Table rows ──────────────────────────────────────────────────────

fn pct(value: Option<f64>) -> String {
    output::opt(value.map(|v| format!("{v:+.1}%")))
}

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Commodity")]
    commodity: String,
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "24h")]
    change24h: String,
    #[tabled(rename = "7d")]
    change7d: String,
    #[tabled(rename = "Date")]
    date: String,
}

impl From<&MarketPrice> for PriceRow {
    fn from(p: &MarketPrice) -> Self {
        let commodity = match &p.variety {
            Some(variety) => format!("{} ({variety})", p.commodity),
            None => p.commodity.clone(),
        };
        Self {
            commodity,
            market: p.market.clone(),
            price: format!("{:.2} {}/{}", p.price, p.currency, p.unit),
            change24h: pct(p.change24h),
            change7d: pct(p.change7d),
            date: p.date.clone(),
        }
    }
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Volume")]
    volume: String,
}

impl From<&PriceHistoryPoint> for HistoryRow {
    fn from(p: &PriceHistoryPoint) -> Self {
        Self {
            date: p.date.clone(),
            price: format!("{:.2}", p.price),
            volume: output::opt(p.volume.map(|v| format!("{v:.0}"))),
        }
    }
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Commodity")]
    commodity: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "24h")]
    change24h: String,
    #[tabled(rename = "7d")]
    change7d: String,
    #[tabled(rename = "Points")]
    points: usize,
}

impl From<&PriceTrend> for TrendRow {
    fn from(t: &PriceTrend) -> Self {
        Self {
            commodity: t.commodity.clone(),
            current: format!("{:.2}", t.current_price),
            change24h: pct(Some(t.change24h)),
            change7d: pct(Some(t.change7d)),
            points: t.data.len(),
        }
    }
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Commodity")]
    commodity: String,
    #[tabled(rename = "Condition")]
    condition: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Last triggered")]
    last_triggered: String,
}

impl From<&PriceAlert> for AlertRow {
    fn from(a: &PriceAlert) -> Self {
        Self {
            id: a.id.clone(),
            commodity: a.commodity.clone(),
            condition: a.condition.to_string(),
            value: format!("{:.2}", a.value),
            active: if a.is_active { "yes" } else { "no" }.into(),
            last_triggered: output::opt(a.last_triggered.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "Name")]
    name: String,
}

fn alert_detail(a: &PriceAlert) -> String {
    format!(
        "{} {} {} {:.2} ({})",
        a.id,
        a.commodity,
        a.condition,
        a.value,
        if a.is_active { "active" } else { "inactive" }
    )
}

fn stats_detail(s: &MarketStats) -> String {
    let mut lines = vec![
        format!("Commodities: {}", s.total_commodities),
        format!("Markets:     {}", s.total_markets),
    ];
    if !s.top_gainers.is_empty() {
        lines.push("Top gainers:".into());
        for m in &s.top_gainers {
            lines.push(format!("  {:<20} {:>10.2} {:>+7.1}%", m.commodity, m.current_price, m.change));
        }
    }
    if !s.top_losers.is_empty() {
        lines.push("Top losers:".into());
        for m in &s.top_losers {
            lines.push(format!("  {:<20} {:>10.2} {:>+7.1}%", m.commodity, m.current_price, m.change));
        }
    }
    lines.join("\n")
}

fn render_names(global: &GlobalOpts, names: &[String]) {
    let out = output::render_list(
        &global.output,
        names,
        |n| NameRow { name: n.clone() },
        String::clone,
    );
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(backend: &Backend, args: PricesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let market = backend.market();

    match args.command {
        PricesCommand::Current {
            commodity,
            market: market_name,
            limit,
        } => {
            let filter = MarketPriceFilter {
                commodity,
                market: market_name,
                limit,
                ..MarketPriceFilter::default()
            };
            let prices = market.current(&filter).await?;
            let out = output::render_list(&global.output, prices.as_slice(), |p| PriceRow::from(p), |p| p.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PricesCommand::History {
            commodity,
            market: market_name,
            start_date,
            end_date,
            interval,
        } => {
            let interval = interval
                .as_deref()
                .map(|raw| util::parse_choice::<HistoryInterval>("interval", raw, INTERVAL_CHOICES))
                .transpose()?;
            let params = PriceHistoryParams {
                market: market_name,
                start_date,
                end_date,
                interval,
            };
            let points = util::require(market.history(&commodity, &params).await?, "commodity")?;
            let out = output::render_list(&global.output, points.as_slice(), |p| HistoryRow::from(p), |p| {
                format!("{}\t{}", p.date, p.price)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PricesCommand::Trends { commodities, days } => {
            let trends = market.trends(&TrendParams::for_commodities(&commodities, days)).await?;
            let out = output::render_list(&global.output, trends.as_slice(), |t| TrendRow::from(t), |t| {
                t.commodity.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PricesCommand::Stats => {
            let stats = market.stats().await?;
            let out = output::render_single(&global.output, &*stats, stats_detail, |s| {
                s.total_commodities.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PricesCommand::Commodities => {
            render_names(global, &market.commodities().await?);
            Ok(())
        }

        PricesCommand::Markets => {
            render_names(global, &market.markets().await?);
            Ok(())
        }

        PricesCommand::Alerts(alerts_args) => {
            let alerts = market.alerts();
            match alerts_args.command {
                AlertsCommand::List => {
                    let list = alerts.all().await?;
                    let out = output::render_list(&global.output, list.as_slice(), |a| AlertRow::from(a), |a| {
                        a.id.clone()
                    });
                    output::print_output(&out, global.quiet);
                    Ok(())
                }

                AlertsCommand::Create {
                    commodity,
                    condition,
                    value,
                    inactive,
                } => {
                    let body = PriceAlertCreate {
                        commodity,
                        condition: util::parse_choice::<PriceAlertCondition>("condition", &condition, CONDITION_CHOICES)?,
                        value,
                        is_active: Some(!inactive),
                    };
                    let created = alerts.create(&body).await?;
                    let out = output::render_single(&global.output, &created, alert_detail, |a| a.id.clone());
                    output::print_output(&out, global.quiet);
                    Ok(())
                }

                AlertsCommand::Update {
                    id,
                    condition,
                    value,
                    active,
                } => {
                    let body = PriceAlertUpdate {
                        condition: condition
                            .as_deref()
                            .map(|raw| util::parse_choice("condition", raw, CONDITION_CHOICES))
                            .transpose()?,
                        value,
                        is_active: active,
                    };
                    let updated = alerts.update(&id, &body).await?;
                    let out = output::render_single(&global.output, &updated, alert_detail, |a| a.id.clone());
                    output::print_output(&out, global.quiet);
                    Ok(())
                }

                AlertsCommand::Delete { id } => {
                    if !util::confirm(&format!("Delete price alert {id}?"), global.yes)? {
                        return Ok(());
                    }
                    alerts.delete(&id).await?;
                    Ok(())
                }
            }
        }
    }
}
