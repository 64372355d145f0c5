//! Command dispatch: bridges CLI args -> backend calls -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod crops;
pub mod dashboard;
pub mod farmers;
pub mod prices;
pub mod recommendations;
pub mod reports;
pub mod suppliers;
pub mod util;
pub mod watch;

use smartfarm_core::Backend;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    backend: &Backend,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Farmers(args) => farmers::handle(backend, args, global).await,
        Command::Crops(args) => crops::handle(backend, args, global).await,
        Command::Recommendations(args) => recommendations::handle(backend, args, global).await,
        Command::Suppliers(args) => suppliers::handle(backend, args, global).await,
        Command::Prices(args) => prices::handle(backend, args, global).await,
        Command::Reports(args) => reports::handle(backend, args, global).await,
        Command::Dashboard(args) => dashboard::handle(backend, args, global).await,
        Command::Watch(args) => watch::handle(backend, args, global).await,
        Command::Login(args) => auth::login(backend, args, profile_name).await,
        Command::Whoami => auth::whoami(backend, global).await,
        // Config, Completions and Logout are handled before dispatch
        Command::Config(_) | Command::Completions(_) | Command::Logout => unreachable!(),
    }
}
