//! Command dispatch: bridges CLI args -> dashboard operations -> output.

pub mod config_cmd;
pub mod devices;
pub mod pm_defaults;
pub mod status;
pub mod util;
pub mod watch;

use gatewatch_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(dashboard, args, global).await,
        Command::PmDefaults => pm_defaults::handle(dashboard, global).await,
        Command::Status(args) => status::handle(dashboard, args, global).await,
        Command::Watch(args) => watch::handle(dashboard, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
