use anyhow::Result;
use chrono::Utc;
use evsync_core::store::LocalStore;
use evsync_core::sync_config::SyncConfig;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::{Render, RenderIn};

pub fn run(config: &SyncConfig) -> Result<()> {
    let store = open_store(config)?;
    let tz = config.time_zone()?;
    let window = config.window(Utc::now());

    let events = store.list();
    let outside = events
        .iter()
        .filter(|e| {
            let (start, end) = e.occupied(tz);
            !window.overlaps(start, end)
        })
        .count();

    println!("📅 {}", config.calendar_id.bold());
    println!(
        "   {} {} → {}",
        "Window:".dimmed(),
        window.from.with_timezone(&tz).format("%Y-%m-%d"),
        window.to.with_timezone(&tz).format("%Y-%m-%d")
    );
    println!(
        "   {} {} ({} outside the window)",
        "Events:".dimmed(),
        events.len(),
        outside
    );

    let unlinked: Vec<_> = events.iter().filter(|e| e.remote_id.is_none()).collect();
    if unlinked.is_empty() {
        println!("   {}", "All events are linked".green());
    } else {
        println!("\n   {}", "Not yet on the remote calendar:".yellow());
        for event in unlinked {
            println!("   {}", event.render_in(tz));
        }
    }

    let tombstones = store.tombstones();
    if !tombstones.is_empty() {
        println!("\n   {}", "Pending remote deletions:".red());
        for tombstone in &tombstones {
            println!("   {}", tombstone.render());
        }
    }

    Ok(())
}
