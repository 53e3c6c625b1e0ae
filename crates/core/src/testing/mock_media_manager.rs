//! Mock media manager for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::media::{MediaEntry, MediaSourceManager, MediaType};
use crate::source::{CachedManager, SourceError};

/// A recorded `delete_media_files` call: type, file ids, stop monitoring.
pub type RecordedMediaDeletion = (MediaType, Vec<i64>, bool);

/// Mock implementation of the MediaSourceManager trait.
///
/// Provides controllable behavior for testing:
/// - Set what the backends report on the next refresh
/// - Track deletions for assertions
/// - Simulate failures and slow backends
///
/// # Example
///
/// ```rust,ignore
/// let manager = MockMediaManager::new();
/// manager.set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])]).await;
///
/// manager.refresh_cache().await?;
/// assert_eq!(manager.get_media().await?.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMediaManager {
    /// What the backends report on refresh.
    backend: Arc<RwLock<Vec<MediaEntry>>>,
    /// State after the last refresh or cache load.
    entries: Arc<RwLock<Vec<MediaEntry>>>,
    deleted: Arc<RwLock<Vec<RecordedMediaDeletion>>>,
    refreshes: Arc<RwLock<u32>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<SourceError>>>,
    /// Time every refresh takes.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockMediaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what the next refresh will report.
    pub async fn set_media(&self, media: Vec<MediaEntry>) {
        *self.backend.write().await = media;
    }

    /// Make the next operation fail.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every refresh take `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Number of live refreshes performed.
    pub async fn refresh_count(&self) -> u32 {
        *self.refreshes.read().await
    }

    /// All recorded deletions.
    pub async fn deleted(&self) -> Vec<RecordedMediaDeletion> {
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
impl CachedManager for MockMediaManager {
    async fn refresh_cache(&self) -> Result<(), SourceError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
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
        let entries: Vec<MediaEntry> =
            serde_json::from_slice(data).map_err(|e| SourceError::Serialization(e.to_string()))?;
        *self.entries.write().await = entries;
        Ok(())
    }
}

#[async_trait]
impl MediaSourceManager for MockMediaManager {
    async fn get_media(&self) -> Result<Vec<MediaEntry>, SourceError> {
        self.take_error().await?;
        Ok(self.entries.read().await.clone())
    }

    async fn delete_media_files(
        &self,
        media_type: MediaType,
        file_ids: &[i64],
        stop_parent_monitoring: bool,
    ) -> Result<(), SourceError> {
        self.take_error().await?;
        self.deleted
            .write()
            .await
            .push((media_type, file_ids.to_vec(), stop_parent_monitoring));

        let mut entries = self.entries.write().await;
        for entry in entries
            .iter_mut()
            .filter(|e| e.metadata.media_type == media_type)
        {
            entry.files.retain(|f| !file_ids.contains(&f.id));
        }
        entries.retain(|e| !e.files.is_empty());
        Ok(())
    }
}
