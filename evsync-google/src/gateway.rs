//! `RemoteGateway` over the Google Calendar v3 REST API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use evsync_core::error::{EvSyncError, EvSyncResult};
use evsync_core::event::LocalEvent;
use evsync_core::remote::{RemoteAck, RemoteBatch, RemoteEvent, RemoteGateway};
use evsync_core::sync_config::SyncConfig;
use evsync_core::window::SyncWindow;
use reqwest::{Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::from_google::FromGoogle;
use crate::session::{GOOGLE_TOKEN_URL, OAuthClient, Session};
use crate::to_google::ToGoogle;
use crate::wire::{ErrorBody, EventsPage, GoogleEvent};

/// Largest page the API will return.
const MAX_RESULTS: &str = "2500";

pub struct GoogleGateway {
    http: reqwest::Client,
    base_url: Url,
    calendar_id: String,
    tz: Tz,
    session: Mutex<Session>,
    oauth: Option<OAuthClient>,
    token_url: String,
}

impl GoogleGateway {
    pub fn new(config: &SyncConfig, session: Session) -> EvSyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(transport)?;

        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            EvSyncError::Config(format!("Invalid api_base_url '{}': {}", config.api_base_url, e))
        })?;

        Ok(GoogleGateway {
            http,
            base_url,
            calendar_id: config.calendar_id.clone(),
            tz: config.time_zone()?,
            session: Mutex::new(session),
            oauth: OAuthClient::from_config(config),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    /// `{base}/calendars/{calendarId}/events[/{eventId}]`, each segment
    /// percent-encoded.
    fn events_url(&self, event_id: Option<&str>) -> EvSyncResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                EvSyncError::Config(format!("api_base_url '{}' cannot be a base", self.base_url))
            })?;
            segments.pop_if_empty().push("calendars").push(&self.calendar_id).push("events");
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// A valid access token, refreshing the session first if needed.
    async fn access_token(&self) -> EvSyncResult<String> {
        let mut session = self.session.lock().await;

        if session.is_expired(Utc::now()) {
            let oauth = self.oauth.as_ref().ok_or_else(|| {
                EvSyncError::AuthRequired(
                    "access token expired and no client_id/client_secret configured".into(),
                )
            })?;
            session.refresh(&self.http, oauth, &self.token_url).await?;
        }

        Ok(session.access_token().to_string())
    }

    async fn write(&self, request: reqwest::RequestBuilder, event: &LocalEvent) -> EvSyncResult<RemoteAck> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .json(&event.to_google(self.tz))
            .send()
            .await
            .map_err(transport)?;

        let written: GoogleEvent = check(response).await?.json().await.map_err(transport)?;
        ack(written)
    }
}

#[async_trait]
impl RemoteGateway for GoogleGateway {
    async fn list(&self, window: &SyncWindow) -> EvSyncResult<RemoteBatch> {
        let url = self.events_url(None)?;
        let mut batch = RemoteBatch::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", window.from_rfc3339()),
                ("timeMax", window.to_rfc3339()),
                ("showDeleted", "true".to_string()),
                ("singleEvents", "true".to_string()),
                ("maxResults", MAX_RESULTS.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let token = self.access_token().await?;
            let response = self
                .http
                .get(url.clone())
                .bearer_auth(token)
                .query(&query)
                .send()
                .await
                .map_err(transport)?;

            let page: EventsPage = check(response).await?.json().await.map_err(transport)?;
            debug!(items = page.items.len(), "fetched events page");

            for item in page.items {
                decode_item(item, &mut batch);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(batch)
    }

    async fn insert(&self, event: &LocalEvent) -> EvSyncResult<RemoteAck> {
        let url = self.events_url(None)?;
        self.write(self.http.post(url), event).await
    }

    async fn update(&self, remote_id: &str, event: &LocalEvent) -> EvSyncResult<RemoteAck> {
        let url = self.events_url(Some(remote_id))?;
        self.write(self.http.put(url), event).await
    }

    async fn delete(&self, remote_id: &str) -> EvSyncResult<()> {
        let url = self.events_url(Some(remote_id))?;
        let token = self.access_token().await?;

        let response = self
            .http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        match check(response).await {
            Ok(_) => Ok(()),
            Err(EvSyncError::NotFound(_)) => {
                debug!(remote_id, "already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Decode one listed item, recording its id as malformed on failure.
fn decode_item(item: serde_json::Value, batch: &mut RemoteBatch) {
    let id = item.get("id").and_then(|v| v.as_str()).map(String::from);

    let decoded = serde_json::from_value::<GoogleEvent>(item)
        .map_err(|e| EvSyncError::MalformedRemote {
            id: id.clone().unwrap_or_default(),
            reason: e.to_string(),
        })
        .and_then(RemoteEvent::from_google);

    match decoded {
        Ok(event) => batch.events.push(event),
        Err(error) => {
            warn!(%error, "skipping malformed remote event");
            if let Some(id) = id {
                batch.malformed.insert(id);
            }
        }
    }
}

fn ack(written: GoogleEvent) -> EvSyncResult<RemoteAck> {
    let remote_id = written.id.ok_or_else(|| EvSyncError::MalformedRemote {
        id: "<unknown>".to_string(),
        reason: "write response has no id".to_string(),
    })?;

    let updated = written
        .updated
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| EvSyncError::MalformedRemote {
            id: remote_id.clone(),
            reason: "write response has no valid updated".to_string(),
        })?;

    Ok(RemoteAck { remote_id, updated })
}

fn transport(e: reqwest::Error) -> EvSyncError {
    EvSyncError::Transport(e.to_string())
}

/// Map non-success statuses onto the error taxonomy.
async fn check(response: Response) -> EvSyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = if body.error.message.is_empty() {
        text
    } else {
        body.error.message.clone()
    };

    match status {
        StatusCode::UNAUTHORIZED => Err(EvSyncError::AuthRequired(message)),
        StatusCode::FORBIDDEN if body.is_auth_error() => Err(EvSyncError::AuthRequired(message)),
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(EvSyncError::NotFound(url)),
        _ => Err(EvSyncError::Remote {
            status: status.as_u16(),
            message,
        }),
    }
}
