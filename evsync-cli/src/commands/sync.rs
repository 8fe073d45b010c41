use anyhow::Result;
use evsync_core::error::EvSyncError;
use evsync_core::sync::SyncOrchestrator;
use evsync_core::sync_config::SyncConfig;
use evsync_google::{GoogleGateway, Session};

use super::open_store;
use crate::render::Render;
use crate::utils::tui;

pub async fn run(config: &SyncConfig) -> Result<()> {
    let store = open_store(config)?;
    let session = Session::load(&Session::default_path()?)?;
    let gateway = GoogleGateway::new(config, session)?;
    let mut orchestrator = SyncOrchestrator::from_config(store, gateway, config)?;

    let spinner = tui::create_spinner(format!("Syncing with {}", config.calendar_id));
    let result = orchestrator.sync().await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            println!("{}", report.render());
            Ok(())
        }
        Err(e @ EvSyncError::AuthRequired(_)) => Err(anyhow::Error::new(e).context(
            "Sync aborted: Google authorization needed.\n\n\
            Store a new session with:\n  \
            evsync auth --refresh-token <token>",
        )),
        Err(e) => Err(anyhow::Error::new(e).context("Sync aborted")),
    }
}
