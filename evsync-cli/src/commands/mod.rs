pub mod auth;
pub mod delete;
pub mod list;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use evsync_core::store::JsonStore;
use evsync_core::sync_config::SyncConfig;
use tracing::debug;

pub fn open_store(config: &SyncConfig) -> Result<JsonStore> {
    let path = config.store_path();
    debug!(path = %path.display(), "opening event store");
    JsonStore::open(&path, config.time_zone()?)
        .with_context(|| format!("Failed to open event store at {}", path.display()))
}
