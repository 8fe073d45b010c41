//! Error types for the evsync engine.

use thiserror::Error;

/// Errors that can occur while syncing or touching the local store.
#[derive(Error, Debug)]
pub enum EvSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Remote event not found: {0}")]
    NotFound(String),

    #[error("Malformed remote event {id}: {reason}")]
    MalformedRemote { id: String, reason: String },

    #[error("Remote id {0} is already linked to another local event")]
    DuplicateRemoteId(String),

    #[error("uid {0} is already used by another local event")]
    DuplicateUid(String),

    #[error("Local event not found: {0}")]
    EventNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EvSyncError {
    /// Errors after which continuing the pass is pointless: every further
    /// remote call would fail the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvSyncError::AuthRequired(_))
    }
}

impl From<serde_json::Error> for EvSyncError {
    fn from(e: serde_json::Error) -> Self {
        EvSyncError::Serialization(e.to_string())
    }
}

/// Result type alias for evsync operations.
pub type EvSyncResult<T> = Result<T, EvSyncError>;
