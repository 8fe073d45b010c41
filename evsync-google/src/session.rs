//! OAuth session (access + refresh token) used to call the Calendar API.
//!
//! Stored as TOML at ~/.config/evsync/session.toml with owner-only
//! permissions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use evsync_core::error::{EvSyncError, EvSyncResult};
use evsync_core::sync_config::SyncConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The OAuth client the refresh token was issued to.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthClient {
    pub fn from_config(config: &SyncConfig) -> Option<Self> {
        Some(OAuthClient {
            client_id: config.client_id.clone()?,
            client_secret: config.client_secret.clone()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    data: SessionData,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl Session {
    pub fn default_path() -> EvSyncResult<PathBuf> {
        Ok(SyncConfig::config_dir()?.join("session.toml"))
    }

    /// A session from a refresh token alone. The access token starts out
    /// expired, so the first API call refreshes it.
    pub fn from_refresh_token(path: impl Into<PathBuf>, refresh_token: &str) -> Self {
        Session {
            path: Some(path.into()),
            data: SessionData {
                access_token: String::new(),
                refresh_token: refresh_token.to_string(),
                expires_at: DateTime::<Utc>::UNIX_EPOCH,
            },
        }
    }

    /// A session that is never written to disk.
    pub fn in_memory(access_token: &str, refresh_token: &str, expires_at: DateTime<Utc>) -> Self {
        Session {
            path: None,
            data: SessionData {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_at,
            },
        }
    }

    pub fn load(path: &Path) -> EvSyncResult<Self> {
        if !path.exists() {
            return Err(EvSyncError::AuthRequired(format!(
                "no Google session at {}, run `evsync auth --refresh-token <token>`",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let data: SessionData = toml::from_str(&contents).map_err(|e| {
            EvSyncError::Config(format!(
                "Failed to parse Google session from {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Session {
            path: Some(path.to_path_buf()),
            data,
        })
    }

    pub fn save(&self) -> EvSyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = toml::to_string_pretty(&self.data)
            .map_err(|e| EvSyncError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;

        // Owner-only: the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn access_token(&self) -> &str {
        &self.data.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.data.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.data.expires_at
    }

    /// Exchange the refresh token for a new access token and save.
    pub async fn refresh(
        &mut self,
        http: &reqwest::Client,
        client: &OAuthClient,
        token_url: &str,
    ) -> EvSyncResult<()> {
        debug!("refreshing Google access token");

        let response = http
            .post(token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.data.refresh_token.as_str()),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EvSyncError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvSyncError::AuthRequired(format!(
                "token refresh rejected ({}): {}",
                status.as_u16(),
                body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvSyncError::Remote {
                status: status.as_u16(),
                message: body,
            });
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| EvSyncError::Transport(e.to_string()))?;

        self.data.access_token = tokens.access_token;
        self.data.expires_at = Utc::now() + Duration::seconds(tokens.expires_in);
        // Google usually keeps the old refresh token
        if let Some(refresh_token) = tokens.refresh_token.filter(|t| !t.is_empty()) {
            self.data.refresh_token = refresh_token;
        }

        self.save()
    }
}
