mod commands;
mod render;
mod utils;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use evsync_core::sync_config::SyncConfig;

#[derive(Parser)]
#[command(name = "evsync")]
#[command(about = "Keep your local events in sync with Google Calendar")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass against the remote calendar
    Sync,
    /// Show pending deletions, unlinked events and the sync window
    Status,
    /// List local events in start order
    List,
    /// Delete a local event; the remote copy is removed on the next sync
    Delete { id: String },
    /// Store a Google OAuth session
    Auth {
        /// Refresh token issued for the configured OAuth client
        #[arg(long)]
        refresh_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = SyncConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Sync => commands::sync::run(&config).await,
        Commands::Status => commands::status::run(&config),
        Commands::List => commands::list::run(&config),
        Commands::Delete { id } => commands::delete::run(&config, &id),
        Commands::Auth { refresh_token } => commands::auth::run(&config, &refresh_token).await,
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "evsync=warn",
        1 => "evsync=info",
        2 => "evsync=debug",
        _ => "evsync=trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}
