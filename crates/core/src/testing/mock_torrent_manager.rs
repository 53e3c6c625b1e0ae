//! Mock torrent manager for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::source::{CachedManager, SourceError};
use crate::torrent::{TorrentEntry, TorrentSourceManager};

/// Mock implementation of the TorrentSourceManager trait.
///
/// Deleting a torrent it does not hold fails with `SourceError::NotFound`.
#[derive(Debug, Default)]
pub struct MockTorrentManager {
    backend: Arc<RwLock<Vec<TorrentEntry>>>,
    entries: Arc<RwLock<Vec<TorrentEntry>>>,
    /// Successful deletions as `(client, id)`.
    deleted: Arc<RwLock<Vec<(String, String)>>>,
    refreshes: Arc<RwLock<u32>>,
    next_error: Arc<RwLock<Option<SourceError>>>,
}

impl MockTorrentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_torrents(&self, torrents: Vec<TorrentEntry>) {
        *self.backend.write().await = torrents;
    }

    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn refresh_count(&self) -> u32 {
        *self.refreshes.read().await
    }

    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.read().await.clone()
    }

    async fn take_error(&self) -> Result<(), SourceError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CachedManager for MockTorrentManager {
    async fn refresh_cache(&self) -> Result<(), SourceError> {
        *self.refreshes.write().await += 1;
        self.take_error().await?;
        *self.entries.write().await = self.backend.read().await.clone();
        Ok(())
    }

    async fn save_cache(&self) -> Result<Vec<u8>, SourceError> {
        serde_json::to_vec(&*self.entries.read().await)
            .map_err(|e| SourceError::Serialization(e.to_string()))
    }

    async fn load_cache(&self, data: &[u8]) -> Result<(), SourceError> {
        let entries: Vec<TorrentEntry> =
            serde_json::from_slice(data).map_err(|e| SourceError::Serialization(e.to_string()))?;
        *self.entries.write().await = entries;
        Ok(())
    }
}

#[async_trait]
impl TorrentSourceManager for MockTorrentManager {
    async fn get_torrents(&self) -> Result<Vec<TorrentEntry>, SourceError> {
        self.take_error().await?;
        Ok(self.entries.read().await.clone())
    }

    async fn delete_torrent(&self, client: &str, id: &str) -> Result<(), SourceError> {
        self.take_error().await?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|t| !(t.client == client && t.id == id));
        if entries.len() == before {
            return Err(SourceError::NotFound(format!("{}/{}", client, id)));
        }
        self.deleted
            .write()
            .await
            .push((client.to_string(), id.to_string()));
        Ok(())
    }
}
