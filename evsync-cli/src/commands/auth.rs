use anyhow::{Context, Result};
use evsync_core::sync_config::SyncConfig;
use evsync_google::session::GOOGLE_TOKEN_URL;
use evsync_google::{OAuthClient, Session};

pub async fn run(config: &SyncConfig, refresh_token: &str) -> Result<()> {
    let client = OAuthClient::from_config(config).with_context(|| {
        format!(
            "Google OAuth client not configured.\n\n\
            Set client_id and client_secret in {}",
            SyncConfig::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "config.toml".to_string())
        )
    })?;

    let path = Session::default_path()?;
    let mut session = Session::from_refresh_token(&path, refresh_token);

    println!("Checking refresh token with Google...");

    // Exchanging the token once proves it works and saves the session
    session
        .refresh(&reqwest::Client::new(), &client, GOOGLE_TOKEN_URL)
        .await
        .context("Failed to exchange refresh token")?;

    println!("Session saved to {}", path.display());
    println!("\nRun `evsync sync` to sync events.");

    Ok(())
}
