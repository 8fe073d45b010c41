use anyhow::{Context, Result};
use evsync_core::store::LocalStore;
use evsync_core::sync_config::SyncConfig;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(config: &SyncConfig, id: &str) -> Result<()> {
    let mut store = open_store(config)?;

    let event = store
        .get(id)
        .with_context(|| format!("No local event with id '{}'", id))?;
    let tombstone = store.remove(id)?;
    store.persist().context("Failed to save event store")?;

    println!("{} {}", "Deleted".red(), event.title);
    if tombstone.remote_id.is_some() {
        println!("{}", "The remote copy will be removed on the next sync.".dimmed());
    }

    Ok(())
}
