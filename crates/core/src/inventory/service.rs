//! Inventory service: the cached, queryable view of linked and evaluated media.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::InventoryConfig;
use crate::media::MediaSourceManager;
use crate::source::{CachedManager, SourceError};
use crate::torrent::TorrentSourceManager;

use super::disk_cache::DiskCache;
use super::rows::{media_row, summary_row};
use super::{
    EnrichedMedia, InventoryError, InventoryPage, Linker, MediaId, MediaRow, RefreshFailure,
    RetentionPolicy, SortInfo,
};

/// Rows per inventory page.
pub const PAGE_SIZE: usize = 10;

type Snapshot = Arc<Vec<EnrichedMedia>>;

/// Where a refresh takes manager state from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    /// Ask the backends.
    Live { persist: bool },
    /// Replay the on-disk snapshots.
    Cached,
}

/// Owns the inventory cache and the operations on it.
///
/// Readers clone the current snapshot and never wait for a refresh, except
/// when the cache has not been populated yet. Refreshes and deletions are
/// serialized and publish a new snapshot when they complete.
pub struct InventoryService {
    media_manager: Arc<dyn MediaSourceManager>,
    torrent_manager: Arc<dyn TorrentSourceManager>,
    linker: Arc<dyn Linker>,
    retention_policy: Arc<dyn RetentionPolicy>,
    clock: Arc<dyn Clock>,
    disk_cache: DiskCache,
    mode: RefreshMode,
    deadline: Option<Duration>,
    cache: RwLock<Option<Snapshot>>,
    writer: Mutex<()>,
}

impl InventoryService {
    pub fn new(
        config: &InventoryConfig,
        media_manager: Arc<dyn MediaSourceManager>,
        torrent_manager: Arc<dyn TorrentSourceManager>,
        linker: Arc<dyn Linker>,
        retention_policy: Arc<dyn RetentionPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mode = if config.use_cached_copy {
            RefreshMode::Cached
        } else {
            RefreshMode::Live {
                persist: config.persist,
            }
        };
        Self {
            media_manager,
            torrent_manager,
            linker,
            retention_policy,
            clock,
            disk_cache: DiskCache::from_config(config),
            mode,
            deadline: config.source_timeout(),
            cache: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Replace the snapshot directory.
    pub fn with_disk_cache(mut self, disk_cache: DiskCache) -> Self {
        self.disk_cache = disk_cache;
        self
    }

    /// Current snapshot, if the cache has been populated.
    pub async fn snapshot(&self) -> Option<Arc<Vec<EnrichedMedia>>> {
        self.cache.read().await.clone()
    }

    /// Rebuild the cache from both managers.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh_cache(&self) -> Result<(), InventoryError> {
        let _writer = self.writer.lock().await;
        self.refresh_locked().await.map(|_| ())
    }

    /// One page of titles, sorted. Pages start at 1.
    pub async fn get_media_inventory(
        &self,
        page: usize,
        sort: SortInfo,
    ) -> Result<InventoryPage, InventoryError> {
        let snapshot = self.populated_snapshot().await?;
        let page = page.max(1);

        sort.warn_if_unknown();
        let mut sorted: Vec<&EnrichedMedia> = snapshot.iter().collect();
        sorted.sort_by(|a, b| sort.compare(a, b));

        let start = (page - 1).saturating_mul(PAGE_SIZE);
        let end = start.saturating_add(PAGE_SIZE).min(sorted.len());
        let now = self.clock.now();
        let rows = sorted
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|media| summary_row(media, now))
            .collect();

        Ok(InventoryPage {
            rows,
            has_next_page: end < sorted.len(),
            page,
        })
    }

    /// Full row tree of the title addressed by `raw_id`.
    ///
    /// File and season suffixes are accepted and address their title.
    pub async fn get_expanded_media_row(&self, raw_id: &str) -> Result<MediaRow, InventoryError> {
        let id: MediaId = raw_id.parse()?;
        let snapshot = self.populated_snapshot().await?;
        snapshot
            .iter()
            .find(|media| media.is(id.media_type, id.id))
            .map(|media| media_row(media, self.clock.now()))
            .ok_or_else(|| InventoryError::MediaNotFound(raw_id.to_string()))
    }

    /// Delete the title, file or season addressed by `raw_id` together with
    /// the torrents its files came from.
    pub async fn delete_media(&self, raw_id: &str) -> Result<(), InventoryError> {
        let id: MediaId = raw_id.parse()?;
        let _writer = self.writer.lock().await;

        let not_found = || InventoryError::MediaNotFound(raw_id.to_string());
        let snapshot = self.snapshot().await.ok_or_else(not_found)?;
        let index = snapshot
            .iter()
            .position(|media| media.is(id.media_type, id.id))
            .ok_or_else(not_found)?;
        let entry = &snapshot[index];

        let selected: Vec<_> = entry
            .linked
            .files
            .iter()
            .filter(|linked| id.selects(&linked.file))
            .collect();
        if selected.is_empty() {
            return Err(not_found());
        }

        let mut deleted_torrents = HashSet::new();
        for linked in &selected {
            let Some(torrent) = &linked.torrent else {
                continue;
            };
            if !deleted_torrents.insert(torrent.key()) {
                continue;
            }
            let stage = format!(
                "delete torrent {} of {:?}",
                torrent.key(),
                entry.linked.metadata.title
            );
            let result = self
                .call(
                    stage,
                    self.torrent_manager
                        .delete_torrent(&torrent.client, &torrent.id),
                )
                .await;
            match result {
                Ok(()) => debug!("Deleted torrent {}", torrent.key()),
                Err(InventoryError::Source { source, .. }) if source.is_not_found() => {
                    warn!(
                        "Could not find torrent {} for deletion of {:?} (file {:?})",
                        torrent.key(),
                        entry.linked.metadata.title,
                        linked.file.original_file_path
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let file_ids: Vec<i64> = selected.iter().map(|linked| linked.file.id).collect();
        self.call(
            format!("delete media files of {:?}", entry.linked.metadata.title),
            self.media_manager
                .delete_media_files(id.media_type, &file_ids, true),
        )
        .await?;

        let mut next: Vec<EnrichedMedia> = snapshot.as_ref().clone();
        if selected.len() == entry.linked.files.len() {
            next.remove(index);
        } else {
            next[index] = entry.without_files(|file| id.selects(file));
        }
        *self.cache.write().await = Some(Arc::new(next));

        info!("Deleted {} ({} files)", id, file_ids.len());
        Ok(())
    }

    /// Current snapshot, populating the cache first if it is empty.
    async fn populated_snapshot(&self) -> Result<Snapshot, InventoryError> {
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot);
        }
        let _writer = self.writer.lock().await;
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot);
        }
        self.refresh_locked().await
    }

    /// Rebuild and publish the cache. Callers hold `writer`.
    async fn refresh_locked(&self) -> Result<Snapshot, InventoryError> {
        let media_task = {
            let manager = Arc::clone(&self.media_manager);
            let disk_cache = self.disk_cache.clone();
            let (mode, deadline) = (self.mode, self.deadline);
            tokio::spawn(async move {
                refresh_manager(manager.as_ref(), &disk_cache, mode, deadline).await
            })
        };
        let torrent_task = {
            let manager = Arc::clone(&self.torrent_manager);
            let disk_cache = self.disk_cache.clone();
            let (mode, deadline) = (self.mode, self.deadline);
            tokio::spawn(async move {
                refresh_manager(manager.as_ref(), &disk_cache, mode, deadline).await
            })
        };
        let (media_result, torrent_result) = tokio::join!(media_task, torrent_task);

        let mut failures = Vec::new();
        for (manager, result) in [
            (self.media_manager.identity(), media_result),
            (self.torrent_manager.identity(), torrent_result),
        ] {
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(e) => InventoryError::Internal(format!("refresh task failed: {}", e)),
            };
            failures.push(RefreshFailure { manager, error });
        }
        if !failures.is_empty() {
            return Err(InventoryError::Refresh(failures));
        }

        let media = self
            .call("get media".to_string(), self.media_manager.get_media())
            .await?;
        let torrents: Vec<_> = self
            .call("get torrents".to_string(), self.torrent_manager.get_torrents())
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();

        let linked = self.linker.link_media(&media, &torrents);
        let enriched = linked
            .into_iter()
            .map(|linked| {
                let report = self.retention_policy.evaluate(&linked)?;
                Ok(EnrichedMedia::new(linked, report))
            })
            .collect::<Result<Vec<_>, InventoryError>>()?;

        info!(
            "Refreshed inventory: {} titles from {} media entries and {} torrents",
            enriched.len(),
            media.len(),
            torrents.len()
        );
        let snapshot = Arc::new(enriched);
        *self.cache.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn call<T>(
        &self,
        stage: String,
        future: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, InventoryError> {
        with_deadline(stage, self.deadline, future).await
    }
}

/// Run a manager call under an optional deadline.
async fn with_deadline<T>(
    stage: String,
    deadline: Option<Duration>,
    future: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, InventoryError> {
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => return Err(InventoryError::Timeout { stage }),
        },
        None => future.await,
    };
    result.map_err(|source| InventoryError::Source { stage, source })
}

async fn refresh_manager<M: CachedManager + ?Sized>(
    manager: &M,
    disk_cache: &DiskCache,
    mode: RefreshMode,
    deadline: Option<Duration>,
) -> Result<(), InventoryError> {
    match mode {
        RefreshMode::Cached => disk_cache.load(manager).await,
        RefreshMode::Live { persist } => {
            debug!("Refreshing {}", manager.identity());
            with_deadline(
                format!("refresh {}", manager.identity()),
                deadline,
                manager.refresh_cache(),
            )
            .await?;
            debug!("Refreshed {}", manager.identity());
            if persist {
                disk_cache.save(manager).await?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Decision, PathLinker, SortKey, SortOrder, TrackerRetentionPolicy};
    use crate::media::MediaType;
    use crate::testing::{
        fixtures, FixedClock, MockMediaManager, MockTorrentManager, MockTrackerResolver,
    };
    use crate::tracker::TrackerError;
    use tempfile::TempDir;

    struct Harness {
        media: Arc<MockMediaManager>,
        torrents: Arc<MockTorrentManager>,
        resolver: Arc<MockTrackerResolver>,
        service: InventoryService,
        _dir: Option<TempDir>,
    }

    fn harness_with(config: InventoryConfig) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut harness = harness_in(config, dir.path());
        harness._dir = Some(dir);
        harness
    }

    fn harness_in(config: InventoryConfig, snapshots: &std::path::Path) -> Harness {
        let media = Arc::new(MockMediaManager::new());
        let torrents = Arc::new(MockTorrentManager::new());
        let resolver = Arc::new(MockTrackerResolver::new());
        let clock = Arc::new(FixedClock::new(fixtures::now()));
        let service = InventoryService::new(
            &config,
            media.clone(),
            torrents.clone(),
            Arc::new(PathLinker::new()),
            Arc::new(TrackerRetentionPolicy::new(resolver.clone(), clock.clone())),
            clock,
        )
        .with_disk_cache(DiskCache::new(snapshots));
        Harness {
            media,
            torrents,
            resolver,
            service,
            _dir: None,
        }
    }

    fn harness() -> Harness {
        harness_with(InventoryConfig::default())
    }

    async fn titles(service: &InventoryService, sort: SortInfo) -> Vec<String> {
        service
            .get_media_inventory(1, sort)
            .await
            .unwrap()
            .rows
            .into_iter()
            .map(|row| row.title)
            .collect()
    }

    #[tokio::test]
    async fn test_first_read_populates_cache() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])])
            .await;

        assert!(h.service.snapshot().await.is_none());
        let page = h
            .service
            .get_media_inventory(1, SortInfo::default())
            .await
            .unwrap();

        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].id, "movie-1");
        assert!(!page.has_next_page);
        assert_eq!(h.media.refresh_count().await, 1);
        assert_eq!(h.torrents.refresh_count().await, 1);

        h.service
            .get_media_inventory(1, SortInfo::default())
            .await
            .unwrap();
        assert_eq!(h.media.refresh_count().await, 1);
    }

    #[tokio::test]
    async fn test_pagination() {
        let h = harness();
        h.media
            .set_media(
                (1..=23)
                    .map(|i| fixtures::movie(i, &format!("Movie {:02}", i), &[(i, "f.mkv", 1)]))
                    .collect(),
            )
            .await;
        let page = |n| h.service.get_media_inventory(n, SortInfo::default());

        let first = page(1).await.unwrap();
        assert_eq!(first.rows.len(), PAGE_SIZE);
        assert!(first.has_next_page);
        assert_eq!(first.rows[0].title, "Movie 01");

        let third = page(3).await.unwrap();
        assert_eq!(third.rows.len(), 3);
        assert!(!third.has_next_page);

        let beyond = page(9).await.unwrap();
        assert!(beyond.rows.is_empty());
        assert!(!beyond.has_next_page);

        let zero = page(0).await.unwrap();
        assert_eq!(zero.page, 1);
        assert_eq!(zero.rows[0].title, "Movie 01");
    }

    #[tokio::test]
    async fn test_sorting() {
        let h = harness();
        h.resolver.add_tracker("tracker.org", fixtures::tracker("t", 5.0, 0));
        h.media
            .set_media(vec![
                fixtures::movie(1, "beta", &[(10, "beta.mkv", 300)]),
                fixtures::movie(2, "Alpha", &[(20, "alpha.mkv", 100)]),
                fixtures::movie(3, "gamma", &[(30, "gamma.mkv", 200)]),
            ])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::torrent("qbit", "g", "gamma.mkv", 1.0, 1)])
            .await;

        let asc = |key| SortInfo::new(key, SortOrder::Asc);
        let desc = |key| SortInfo::new(key, SortOrder::Desc);

        assert_eq!(
            titles(&h.service, asc(SortKey::Name)).await,
            ["Alpha", "beta", "gamma"]
        );
        assert_eq!(
            titles(&h.service, desc(SortKey::Size)).await,
            ["beta", "gamma", "Alpha"]
        );
        assert_eq!(titles(&h.service, desc(SortKey::Status)).await[0], "gamma");
        assert_eq!(titles(&h.service, asc(SortKey::Status)).await[2], "gamma");
        assert_eq!(
            titles(&h.service, asc(SortKey::Unknown)).await,
            ["beta", "Alpha", "gamma"]
        );
        assert_eq!(
            titles(&h.service, desc(SortKey::Unknown)).await,
            ["beta", "Alpha", "gamma"]
        );
    }

    #[tokio::test]
    async fn test_added_uses_latest_torrent() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::torrent("qbit", "a", "alpha.mkv", 1.0, 1)])
            .await;

        h.service.refresh_cache().await.unwrap();
        let snapshot = h.service.snapshot().await.unwrap();
        assert_eq!(
            snapshot[0].added,
            fixtures::now() - chrono::Duration::days(1)
        );
        assert_eq!(snapshot[0].size, 100);
    }

    #[tokio::test]
    async fn test_refresh_joins_both_failures_and_keeps_cache() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])])
            .await;
        h.service.refresh_cache().await.unwrap();
        let before = h.service.snapshot().await.unwrap();

        h.media
            .set_next_error(SourceError::ApiError("sonarr down".to_string()))
            .await;
        h.torrents
            .set_next_error(SourceError::ConnectionFailed("qbit down".to_string()))
            .await;

        match h.service.refresh_cache().await {
            Err(InventoryError::Refresh(failures)) => {
                assert_eq!(failures.len(), 2);
                let message = InventoryError::Refresh(failures).to_string();
                assert!(message.contains("sonarr down"));
                assert!(message.contains("qbit down"));
            }
            other => panic!("expected refresh failure, got {:?}", other),
        }

        let after = h.service.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_evaluation_failure_keeps_cache() {
        let h = harness();
        h.resolver.add_tracker("tracker.org", fixtures::tracker("t", 1.0, 0));
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::torrent("qbit", "a", "alpha.mkv", 2.0, 1)])
            .await;
        h.service.refresh_cache().await.unwrap();
        let before = h.service.snapshot().await.unwrap();

        h.resolver.set_next_error(TrackerError::Internal("resolver down".to_string()));
        match h.service.refresh_cache().await {
            Err(InventoryError::Evaluation { file, .. }) => assert!(file.contains("alpha.mkv")),
            other => panic!("expected evaluation failure, got {:?}", other),
        }

        let after = h.service.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(h.media.refresh_count().await, 2);
    }

    #[tokio::test]
    async fn test_readers_see_previous_snapshot_during_slow_refresh() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])])
            .await;
        h.service.refresh_cache().await.unwrap();

        h.media
            .set_media(vec![fixtures::movie(2, "Beta", &[(20, "beta.mkv", 100)])])
            .await;
        h.media.set_delay(Duration::from_millis(500)).await;

        let read_during_refresh = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::time::timeout(
                Duration::from_millis(100),
                titles(&h.service, SortInfo::default()),
            )
            .await
        };
        let (refreshed, read) = tokio::join!(h.service.refresh_cache(), read_during_refresh);

        refreshed.unwrap();
        assert_eq!(read.expect("reader waited for the refresh"), ["Alpha"]);
        assert_eq!(titles(&h.service, SortInfo::default()).await, ["Beta"]);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let h = harness();
        h.resolver.add_tracker("tracker.org", fixtures::tracker("t", 1.0, 0));
        h.media
            .set_media(vec![fixtures::series(
                5,
                "Show",
                &[(1, 1, "e1.mkv", 10), (2, 1, "e2.mkv", 10)],
            )])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::torrent("qbit", "a", "e1.mkv", 2.0, 3)])
            .await;

        h.service.refresh_cache().await.unwrap();
        let first = h.service.snapshot().await.unwrap();
        h.service.refresh_cache().await.unwrap();
        let second = h.service.snapshot().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_source_deadline() {
        let h = harness_with(InventoryConfig {
            source_timeout_secs: 1,
            ..InventoryConfig::default()
        });
        h.media.set_delay(Duration::from_secs(5)).await;

        let result = h.service.refresh_cache().await;
        match result {
            Err(InventoryError::Refresh(failures)) => {
                assert_eq!(failures.len(), 1);
                assert!(matches!(failures[0].error, InventoryError::Timeout { .. }));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expanded_row() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::series(
                5,
                "Show",
                &[(1, 1, "e1.mkv", 10), (2, 2, "e2.mkv", 10)],
            )])
            .await;

        let row = h
            .service
            .get_expanded_media_row("series-5-s-1")
            .await
            .unwrap();
        assert_eq!(row.id, "series-5");
        assert_eq!(row.children.len(), 2);
        assert_eq!(row.children[0].id, "series-5-s-1");

        let err = h
            .service
            .get_expanded_media_row("series-6")
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::MediaNotFound(_)));

        let err = h
            .service
            .get_expanded_media_row("series-x")
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::MalformedId(_)));
    }

    #[tokio::test]
    async fn test_delete_single_file_keeps_order() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(
                1,
                "Alpha",
                &[(10, "a.mkv", 1), (11, "b.mkv", 2), (12, "c.mkv", 4)],
            )])
            .await;
        h.service.refresh_cache().await.unwrap();

        h.service.delete_media("movie-1-11").await.unwrap();

        assert_eq!(
            h.media.deleted().await,
            vec![(MediaType::Movie, vec![11], true)]
        );
        let snapshot = h.service.snapshot().await.unwrap();
        let ids: Vec<i64> = snapshot[0].linked.files.iter().map(|f| f.file.id).collect();
        assert_eq!(ids, vec![10, 12]);
        assert_eq!(snapshot[0].size, 5);
        assert_eq!(snapshot[0].report.files.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_last_file_removes_entry() {
        let h = harness();
        h.media
            .set_media(vec![
                fixtures::movie(1, "Alpha", &[(10, "a.mkv", 1)]),
                fixtures::movie(2, "Beta", &[(20, "b.mkv", 1)]),
            ])
            .await;
        h.service.refresh_cache().await.unwrap();

        h.service.delete_media("movie-1-10").await.unwrap();

        let snapshot = h.service.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].linked.metadata.id, 2);
        let err = h.service.delete_media("movie-1").await.unwrap_err();
        assert!(matches!(err, InventoryError::MediaNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_season_deduplicates_torrents() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::series(
                5,
                "Show",
                &[
                    (1, 1, "e1.mkv", 10),
                    (2, 1, "e2.mkv", 10),
                    (3, 2, "e3.mkv", 10),
                ],
            )])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::season_pack(
                "qbit",
                "pack",
                &[("e1.mkv", 10), ("e2.mkv", 10)],
            )])
            .await;
        h.service.refresh_cache().await.unwrap();

        h.service.delete_media("series-5-s-1").await.unwrap();

        assert_eq!(
            h.torrents.deleted().await,
            vec![("qbit".to_string(), "pack".to_string())]
        );
        assert_eq!(
            h.media.deleted().await,
            vec![(MediaType::Series, vec![1, 2], true)]
        );
        let snapshot = h.service.snapshot().await.unwrap();
        let ids: Vec<i64> = snapshot[0].linked.files.iter().map(|f| f.file.id).collect();
        assert_eq!(ids, vec![3]);
        assert!(!snapshot[0].report.seasons.contains_key(&1));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_torrent() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 1)])])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::torrent("qbit", "a", "alpha.mkv", 1.0, 1)])
            .await;
        h.service.refresh_cache().await.unwrap();

        h.torrents.set_next_error(SourceError::NotFound("a".to_string())).await;
        h.service.delete_media("movie-1").await.unwrap();

        assert!(h.service.snapshot().await.unwrap().is_empty());
        assert_eq!(h.media.deleted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_aborts_on_torrent_failure() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 1)])])
            .await;
        h.torrents
            .set_torrents(vec![fixtures::torrent("qbit", "a", "alpha.mkv", 1.0, 1)])
            .await;
        h.service.refresh_cache().await.unwrap();

        h.torrents.set_next_error(SourceError::Timeout).await;
        let err = h.service.delete_media("movie-1").await.unwrap_err();
        assert!(matches!(err, InventoryError::Source { .. }));

        assert!(h.media.deleted().await.is_empty());
        assert_eq!(h.service.snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_selection() {
        let h = harness();
        h.media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 1)])])
            .await;
        h.service.refresh_cache().await.unwrap();

        let err = h.service.delete_media("movie-1-99").await.unwrap_err();
        assert!(matches!(err, InventoryError::MediaNotFound(_)));
        let err = h.service.delete_media("film-1").await.unwrap_err();
        assert!(matches!(err, InventoryError::MalformedId(_)));
    }

    #[tokio::test]
    async fn test_persist_then_replay_from_disk() {
        let dir = TempDir::new().unwrap();
        let persisting = harness_in(
            InventoryConfig {
                persist: true,
                ..InventoryConfig::default()
            },
            dir.path(),
        );
        persisting
            .media
            .set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 1)])])
            .await;
        persisting.service.refresh_cache().await.unwrap();

        let replaying = harness_in(
            InventoryConfig {
                use_cached_copy: true,
                ..InventoryConfig::default()
            },
            dir.path(),
        );
        replaying.service.refresh_cache().await.unwrap();

        assert_eq!(replaying.media.refresh_count().await, 0);
        let snapshot = replaying.service.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].report.result.decision, Decision::SafeToDelete);
    }
}
