//! parkval CLI
//!
//! Consults or validates a parking ticket against the validation terminal
//! and manages the outbox of undelivered result notifications.

mod amount;
mod discount_cmd;
mod notifications_cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use discount_cmd::DiscountArgs;
use notifications_cmd::NotificationAction;
use parkval_protocol::Command;

#[derive(Parser, Debug)]
#[command(name = "parkval")]
#[command(version, about = "Parking ticket validation client", long_about = None)]
struct Cli {
    /// Directory holding the project `.parkval/settings.json` (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Emit JSON log lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the terminal whether a ticket can be validated, without validating it
    Consult(DiscountArgs),
    /// Validate a ticket against a purchase
    Validate(DiscountArgs),
    /// Inspect or retry undelivered notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let project_dir = match cli.project_dir {
        Some(dir) => Some(dir),
        None => std::env::current_dir().ok(),
    };
    let config = parkval_core::config::load_config(project_dir.as_deref())?;

    let filter = format!("parkval={0},parkval_client={0},parkval_notify={0}", config.log_level);
    parkval_core::tracing_init::init_tracing(&filter, cli.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting parkval");
    for ignored in &config.ignored_env {
        warn!(key = ignored.key, value = %ignored.value, "Ignoring invalid environment override");
    }

    match cli.command {
        Commands::Consult(args) => discount_cmd::run(Command::Consult, args, config).await,
        Commands::Validate(args) => discount_cmd::run(Command::Validation, args, config).await,
        Commands::Notifications { action } => notifications_cmd::run(action, &config).await,
    }
}
