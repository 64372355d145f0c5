//! Live realtime event stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use smartfarm_core::{Backend, ConnectionState, Subscription};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct WatchEvent {
    received_at: DateTime<Utc>,
    event: String,
    data: Value,
}

fn render(format: &OutputFormat, ev: &WatchEvent) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain => format!(
            "{} {:<16} {}",
            ev.received_at.format("%H:%M:%S"),
            ev.event,
            output::render_json(&ev.data, true)
        ),
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(ev)),
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(ev, true),
    }
}

pub async fn handle(backend: &Backend, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = backend.config();
    if !config.realtime_enabled {
        return Err(CliError::Validation {
            field: "realtime".into(),
            reason: "realtime is disabled for this profile; run `smartfarm config set realtime true`".into(),
        });
    }
    let ws_url = config.ws_url.to_string();

    let (tx, mut rx) = mpsc::unbounded_channel::<(String, Value)>();
    let channels = backend.channels();
    let _subscriptions: Vec<Subscription> = args
        .events
        .iter()
        .map(|event| {
            let tx = tx.clone();
            let name = event.clone();
            let forward = move |payload: &Value| {
                let _ = tx.send((name.clone(), payload.clone()));
            };
            if args.request {
                channels.subscribe_with_request(event, forward)
            } else {
                channels.subscribe(event, forward)
            }
        })
        .collect();
    drop(tx);

    let mut state = channels.state();
    backend.start_realtime().await;
    tracing::info!(url = %ws_url, events = ?args.events, "watching realtime events");

    let mut seen = 0usize;
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some((event, data)) = received else { break };
                let ev = WatchEvent { received_at: Utc::now(), event, data };
                output::print_output(&render(&global.output, &ev), global.quiet);
                seen += 1;
                if args.count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                match current {
                    ConnectionState::Failed => return Err(CliError::RealtimeLost { url: ws_url }),
                    ConnectionState::Reconnecting { attempt } => {
                        tracing::warn!(attempt, "realtime connection lost, reconnecting");
                    }
                    ConnectionState::Connected => tracing::info!("realtime connected"),
                    ConnectionState::Connecting | ConnectionState::Disconnected => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> WatchEvent {
        WatchEvent {
            received_at: DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            event: "priceUpdate".into(),
            data: serde_json::json!({"commodity": "maize", "price": 312.5}),
        }
    }

    #[test]
    fn table_lines_carry_time_and_event() {
        let line = render(&OutputFormat::Table, &sample());
        assert!(line.starts_with("08:30:00 priceUpdate"));
        assert!(line.contains(r#""commodity":"maize""#));
    }

    #[test]
    fn json_lines_are_single_line() {
        let line = render(&OutputFormat::Json, &sample());
        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "priceUpdate");
        assert_eq!(parsed["data"]["price"], 312.5);
    }
}
