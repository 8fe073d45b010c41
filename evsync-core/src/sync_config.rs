//! evsync configuration.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictPolicy;
use crate::error::{EvSyncError, EvSyncResult};
use crate::window::SyncWindow;

pub const DEFAULT_COLOR: &str = "#3b82f6";
const DEFAULT_CALENDAR_ID: &str = "primary";
const MAX_WINDOW_DAYS: i64 = 36_500;
const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("evsync").join("events.json"))
        .unwrap_or_else(|| PathBuf::from("~/.evsync/events.json"))
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_skew_tolerance_ms() -> i64 {
    1000
}

fn default_window_past_days() -> i64 {
    30
}

fn default_window_future_days() -> i64 {
    365
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Configuration at ~/.config/evsync/config.toml, overridable with
/// `EVSYNC_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timestamp difference below which two edits count as simultaneous.
    #[serde(default = "default_skew_tolerance_ms")]
    pub skew_tolerance_ms: i64,

    #[serde(default = "default_window_past_days")]
    pub window_past_days: i64,

    #[serde(default = "default_window_future_days")]
    pub window_future_days: i64,

    /// IANA zone the all-day dates are interpreted in.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    #[serde(default = "default_color")]
    pub default_color: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            store_path: default_store_path(),
            calendar_id: default_calendar_id(),
            api_base_url: default_api_base_url(),
            skew_tolerance_ms: default_skew_tolerance_ms(),
            window_past_days: default_window_past_days(),
            window_future_days: default_window_future_days(),
            time_zone: default_time_zone(),
            default_color: default_color(),
            request_timeout_secs: default_request_timeout_secs(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl SyncConfig {
    pub fn config_dir() -> EvSyncResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| EvSyncError::Config("Could not determine config directory".into()))?
            .join("evsync"))
    }

    pub fn config_path() -> EvSyncResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default location, creating a commented template on
    /// first run.
    pub fn load() -> EvSyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::from_file(&config_path)
    }

    pub fn from_file(path: &Path) -> EvSyncResult<Self> {
        let config: SyncConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("EVSYNC").try_parsing(true))
            .build()
            .map_err(|e| EvSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| EvSyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EvSyncResult<()> {
        for (key, days) in [
            ("window_past_days", self.window_past_days),
            ("window_future_days", self.window_future_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(EvSyncError::Config(format!(
                    "{key} must be between 0 and {MAX_WINDOW_DAYS}, got {days}"
                )));
            }
        }
        Ok(())
    }

    /// Create a config file with all options commented out.
    pub fn create_default_config(path: &Path) -> EvSyncResult<()> {
        let contents = format!(
            "\
# evsync configuration

# Where the local event store lives:
# store_path = \"{}\"

# Remote calendar to sync with:
# calendar_id = \"{}\"

# Edits closer together than this (milliseconds) count as simultaneous:
# skew_tolerance_ms = {}

# Sync window around now, in days:
# window_past_days = {}
# window_future_days = {}

# Time zone all-day events are interpreted in:
# time_zone = \"UTC\"

# OAuth client used to refresh access tokens:
# client_id = \"your-client-id.apps.googleusercontent.com\"
# client_secret = \"your-client-secret\"
",
            default_store_path().display(),
            DEFAULT_CALENDAR_ID,
            default_skew_tolerance_ms(),
            default_window_past_days(),
            default_window_future_days(),
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EvSyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| EvSyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// `store_path` with `~` expanded.
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_path.to_string_lossy()).into_owned())
    }

    pub fn time_zone(&self) -> EvSyncResult<Tz> {
        self.time_zone
            .parse()
            .map_err(|_| EvSyncError::Config(format!("Unknown time zone '{}'", self.time_zone)))
    }

    pub fn window(&self, now: DateTime<Utc>) -> SyncWindow {
        SyncWindow::around(now, self.window_past_days, self.window_future_days)
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy::new(self.skew_tolerance_ms)
    }
}
