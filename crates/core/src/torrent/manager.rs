//! Default torrent manager fanning out to every configured client.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::debug;

use crate::source::{CachedManager, SourceError};

use super::{TorrentEntry, TorrentSource, TorrentSourceManager};

type EntriesByClient = BTreeMap<String, Vec<TorrentEntry>>;

/// Torrent manager caching the torrents of all registered clients.
///
/// Entries are keyed by client name in an ordered map, so `get_torrents`
/// yields torrents in a stable order: by client name, then in the order the
/// client reported them.
pub struct DefaultTorrentManager {
    sources: BTreeMap<String, Arc<dyn TorrentSource>>,
    /// `None` until the first refresh or cache load.
    entries: RwLock<Option<EntriesByClient>>,
}

impl DefaultTorrentManager {
    /// Create a manager over the given clients.
    pub fn new(sources: Vec<Arc<dyn TorrentSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.name().to_string(), source))
            .collect();
        Self {
            sources,
            entries: RwLock::new(None),
        }
    }

    /// Names of registered clients.
    pub fn client_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }
}

#[async_trait]
impl CachedManager for DefaultTorrentManager {
    async fn refresh_cache(&self) -> Result<(), SourceError> {
        let handles = self.sources.iter().map(|(name, source)| {
            let name = name.clone();
            let source = Arc::clone(source);
            tokio::spawn(async move {
                debug!("Refreshing torrent cache for client {}", name);
                let result = source.get_torrent_entries().await;
                debug!("Refreshed torrent cache for client {}", name);
                (name, result)
            })
        });

        let mut fresh = EntriesByClient::new();
        let mut errors = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((name, Ok(torrents))) => {
                    fresh.insert(name, torrents);
                }
                Ok((name, Err(e))) => errors.push(SourceError::ApiError(format!(
                    "could not get torrent entries for client {:?}: {}",
                    name, e
                ))),
                Err(e) => errors.push(SourceError::Internal(format!(
                    "torrent refresh task failed: {}",
                    e
                ))),
            }
        }
        SourceError::join(errors)?;

        *self.entries.write().await = Some(fresh);
        Ok(())
    }

    async fn save_cache(&self) -> Result<Vec<u8>, SourceError> {
        let entries = self.entries.read().await;
        let empty = EntriesByClient::new();
        serde_json::to_vec(entries.as_ref().unwrap_or(&empty))
            .map_err(|e| SourceError::Serialization(e.to_string()))
    }

    async fn load_cache(&self, data: &[u8]) -> Result<(), SourceError> {
        let loaded: EntriesByClient =
            serde_json::from_slice(data).map_err(|e| SourceError::Serialization(e.to_string()))?;
        *self.entries.write().await = Some(loaded);
        Ok(())
    }
}

#[async_trait]
impl TorrentSourceManager for DefaultTorrentManager {
    async fn get_torrents(&self) -> Result<Vec<TorrentEntry>, SourceError> {
        if self.entries.read().await.is_none() {
            self.refresh_cache().await?;
        }
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .flat_map(|m| m.values())
            .flatten()
            .cloned()
            .collect())
    }

    async fn delete_torrent(&self, client: &str, id: &str) -> Result<(), SourceError> {
        let source = self.sources.get(client).ok_or_else(|| {
            SourceError::Internal(format!("no torrent client registered as {:?}", client))
        })?;
        source.delete_torrent(id).await?;

        if let Some(entries) = self.entries.write().await.as_mut() {
            if let Some(list) = entries.get_mut(client) {
                list.retain(|t| t.id != id);
            }
        }
        Ok(())
    }
}
