use anyhow::Result;
use evsync_core::store::LocalStore;
use evsync_core::sync_config::SyncConfig;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::RenderIn;

pub fn run(config: &SyncConfig) -> Result<()> {
    let store = open_store(config)?;
    let tz = config.time_zone()?;

    let mut events = store.list();
    if events.is_empty() {
        println!("{}", "No events".dimmed());
        return Ok(());
    }

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));

    for event in &events {
        println!("{}", event.render_in(tz));
    }

    Ok(())
}
