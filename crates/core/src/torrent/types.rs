//! Types for torrent client operations.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::{CachedManager, SourceError};

/// A file inside a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// A torrent as reported by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentEntry {
    /// Name of the client holding the torrent.
    pub client: String,
    /// Client-local id (info hash for most clients).
    pub id: String,
    pub name: String,
    /// Upload/download ratio.
    pub ratio: f64,
    pub added: DateTime<Utc>,
    /// Tracker host names the torrent announces to.
    pub trackers: Vec<String>,
    pub files: Vec<TorrentFile>,
}

impl TorrentEntry {
    /// Identity of the torrent across clients.
    pub fn key(&self) -> TorrentKey {
        TorrentKey {
            client: self.client.clone(),
            id: self.id.clone(),
        }
    }
}

/// Value identity of a torrent: `(client, id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TorrentKey {
    pub client: String,
    pub id: String,
}

impl fmt::Display for TorrentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.client, self.id)
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentSource: Send + Sync {
    /// Client name, unique among configured clients.
    fn name(&self) -> &str;

    /// List torrents of this client.
    async fn get_torrent_entries(&self) -> Result<Vec<TorrentEntry>, SourceError>;

    /// Remove a torrent together with its data.
    /// Returns `SourceError::NotFound` if the client does not know the id.
    async fn delete_torrent(&self, id: &str) -> Result<(), SourceError>;
}

/// Aggregates all torrent clients behind one cached view.
#[async_trait]
pub trait TorrentSourceManager: CachedManager {
    /// All known torrents across clients.
    async fn get_torrents(&self) -> Result<Vec<TorrentEntry>, SourceError>;

    /// Delete a torrent from the named client.
    async fn delete_torrent(&self, client: &str, id: &str) -> Result<(), SourceError>;
}
