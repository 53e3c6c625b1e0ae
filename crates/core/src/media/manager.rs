//! Default media manager fanning out to one source per media type.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::debug;

use crate::source::{CachedManager, SourceError};

use super::{MediaEntry, MediaSource, MediaSourceManager, MediaType};

type EntriesByType = BTreeMap<MediaType, Vec<MediaEntry>>;

/// Media manager that caches the titles of all registered sources.
///
/// Only one source per media type is kept; registering a second source for
/// the same type replaces the first.
pub struct DefaultMediaManager {
    sources: BTreeMap<MediaType, Arc<dyn MediaSource>>,
    /// `None` until the first refresh or cache load.
    entries: RwLock<Option<EntriesByType>>,
}

impl DefaultMediaManager {
    /// Create a manager over the given sources.
    pub fn new(sources: Vec<Arc<dyn MediaSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.supported_media_type(), source))
            .collect();
        Self {
            sources,
            entries: RwLock::new(None),
        }
    }

    /// Media types with a registered source.
    pub fn media_types(&self) -> Vec<MediaType> {
        self.sources.keys().copied().collect()
    }

    async fn fetch_all(&self) -> Result<EntriesByType, SourceError> {
        let handles = self.sources.iter().map(|(media_type, source)| {
            let media_type = *media_type;
            let source = Arc::clone(source);
            tokio::spawn(async move {
                debug!("Refreshing media cache for type {}", media_type);
                let result = source.get_media().await;
                debug!("Refreshed media cache for type {}", media_type);
                (media_type, result)
            })
        });

        let mut entries = EntriesByType::new();
        let mut errors = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((media_type, Ok(media))) => {
                    entries.insert(media_type, media);
                }
                Ok((media_type, Err(e))) => errors.push(SourceError::ApiError(format!(
                    "could not get media entries for type {}: {}",
                    media_type, e
                ))),
                Err(e) => errors.push(SourceError::Internal(format!(
                    "media refresh task failed: {}",
                    e
                ))),
            }
        }
        SourceError::join(errors)?;
        Ok(entries)
    }
}

#[async_trait]
impl CachedManager for DefaultMediaManager {
    async fn refresh_cache(&self) -> Result<(), SourceError> {
        let fresh = self.fetch_all().await?;
        *self.entries.write().await = Some(fresh);
        Ok(())
    }

    async fn save_cache(&self) -> Result<Vec<u8>, SourceError> {
        let entries = self.entries.read().await;
        let flat: Vec<&MediaEntry> = entries.iter().flat_map(|m| m.values()).flatten().collect();
        serde_json::to_vec(&flat).map_err(|e| SourceError::Serialization(e.to_string()))
    }

    async fn load_cache(&self, data: &[u8]) -> Result<(), SourceError> {
        let flat: Vec<MediaEntry> =
            serde_json::from_slice(data).map_err(|e| SourceError::Serialization(e.to_string()))?;
        let mut grouped = EntriesByType::new();
        for entry in flat {
            grouped
                .entry(entry.metadata.media_type)
                .or_default()
                .push(entry);
        }
        *self.entries.write().await = Some(grouped);
        Ok(())
    }
}

#[async_trait]
impl MediaSourceManager for DefaultMediaManager {
    async fn get_media(&self) -> Result<Vec<MediaEntry>, SourceError> {
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

    async fn delete_media_files(
        &self,
        media_type: MediaType,
        file_ids: &[i64],
        stop_parent_monitoring: bool,
    ) -> Result<(), SourceError> {
        let source = self.sources.get(&media_type).ok_or_else(|| {
            SourceError::Internal(format!("no media source registered for type {}", media_type))
        })?;
        source
            .delete_media_files(file_ids, stop_parent_monitoring)
            .await?;

        if let Some(entries) = self.entries.write().await.as_mut() {
            if let Some(list) = entries.get_mut(&media_type) {
                for entry in list.iter_mut() {
                    entry.files.retain(|f| !file_ids.contains(&f.id));
                }
                list.retain(|entry| !entry.files.is_empty());
            }
        }
        Ok(())
    }
}
