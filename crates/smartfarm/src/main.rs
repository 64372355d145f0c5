mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use smartfarm_core::{AuthCredentials, Backend, Notification, NotificationLevel};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Local-only commands never build a backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "smartfarm", &mut std::io::stdout());
            Ok(())
        }

        Command::Logout => commands::auth::logout(&cli.global),

        cmd => {
            let (backend_config, profile_name) = config::resolve_backend_config(&cli.global)?;
            let password_login = matches!(backend_config.auth, AuthCredentials::Password { .. });
            let backend = Backend::new(backend_config)?;

            if password_login && !matches!(cmd, Command::Login(_)) {
                backend.login().await?;
            }

            let mut notes = backend.notifier().subscribe();
            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            let result = commands::dispatch(cmd, &backend, &profile_name, &cli.global).await;

            flush_notifications(&mut notes, &cli.global, result.is_err());
            backend.shutdown().await;
            result
        }
    }
}

/// Print notifications raised while the command ran. Error toasts are
/// skipped when the command itself failed; miette reports that error.
fn flush_notifications(notes: &mut broadcast::Receiver<Notification>, global: &GlobalOpts, failed: bool) {
    let color = output::should_color(&global.color);
    while let Ok(note) = notes.try_recv() {
        if failed && note.level == NotificationLevel::Error {
            continue;
        }
        if global.quiet && note.level != NotificationLevel::Error {
            continue;
        }
        output::print_notification(&note, color);
    }
}
