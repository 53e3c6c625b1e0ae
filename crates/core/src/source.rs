//! Shared contracts for the media and torrent managers.
//!
//! Both managers keep an in-memory copy of what their backends reported and
//! can dump/restore that copy so a refresh can be served from disk.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by media/torrent managers and the adapters behind them.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Cache serialization failed: {0}")]
    Serialization(String),

    #[error("Request timeout")]
    Timeout,

    #[error("{}", join_messages(.0))]
    Multiple(Vec<SourceError>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SourceError {
    /// Whether this error means the addressed item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }

    /// Fold a list of errors into one, or `Ok(())` when the list is empty.
    pub fn join(mut errors: Vec<SourceError>) -> Result<(), SourceError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SourceError::Multiple(errors)),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_connect() {
            SourceError::ConnectionFailed(e.to_string())
        } else {
            SourceError::ApiError(e.to_string())
        }
    }
}

fn join_messages(errors: &[SourceError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A manager whose state can be refreshed from its backends or persisted.
#[async_trait]
pub trait CachedManager: Send + Sync {
    /// Stable identity of the manager implementation.
    ///
    /// Used to name the on-disk snapshot, so it must not change between runs
    /// of the same build.
    fn identity(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Reload state from the backends.
    async fn refresh_cache(&self) -> Result<(), SourceError>;

    /// Serialize the current state.
    async fn save_cache(&self) -> Result<Vec<u8>, SourceError>;

    /// Replace the current state with a previously saved one.
    async fn load_cache(&self, data: &[u8]) -> Result<(), SourceError>;
}
