//! Inventory lifecycle integration tests.
//!
//! These tests drive the inventory the way the HTTP surface does:
//! refresh -> list -> expand -> delete -> refresh again

use std::sync::Arc;

use tempfile::TempDir;

use seedwarden_core::{
    config::{InventoryConfig, TrackerConfig},
    inventory::{
        Decision, DiskCache, InventoryError, LinkStatus, PathLinker, SortKey, SortOrder,
        TrackerRetentionPolicy,
    },
    media::MediaType,
    testing::{fixtures, FixedClock, MockMediaManager, MockTorrentManager},
    tracker::PatternTrackerResolver,
    InventoryService, SortInfo, SourceError,
};

/// Test helper wiring mocks behind a real linker, policy and resolver.
struct TestHarness {
    media: Arc<MockMediaManager>,
    torrents: Arc<MockTorrentManager>,
    service: InventoryService,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let media = Arc::new(MockMediaManager::new());
        let torrents = Arc::new(MockTorrentManager::new());
        let clock = Arc::new(FixedClock::new(fixtures::now()));

        // Five days and a ratio of 1 on the fixture tracker
        let resolver = PatternTrackerResolver::new(&[TrackerConfig {
            name: "fixture".to_string(),
            pattern: r"^tracker\.org$".to_string(),
            min_ratio: 1.0,
            min_age_hours: 5 * 24,
        }])
        .expect("Failed to build resolver");

        let service = InventoryService::new(
            &InventoryConfig::default(),
            media.clone(),
            torrents.clone(),
            Arc::new(PathLinker::new()),
            Arc::new(TrackerRetentionPolicy::new(Arc::new(resolver), clock.clone())),
            clock,
        )
        .with_disk_cache(DiskCache::new(temp_dir.path()));

        media
            .set_media(vec![
                fixtures::series(
                    5,
                    "Show",
                    &[
                        (1, 1, "e1.mkv", 10),
                        (2, 1, "e2.mkv", 10),
                        (3, 2, "e3.mkv", 10),
                    ],
                ),
                fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)]),
            ])
            .await;
        torrents
            .set_torrents(vec![
                fixtures::season_pack("qbit", "pack", &[("e1.mkv", 10), ("e2.mkv", 10)]),
                fixtures::torrent("qbit", "solo", "e3.mkv", 0.2, 1),
                fixtures::torrent("qbit", "alpha", "alpha.mkv", 3.0, 40),
            ])
            .await;

        Self {
            media,
            torrents,
            service,
            _temp_dir: temp_dir,
        }
    }
}

#[tokio::test]
async fn test_listing_reflects_retention_rules() {
    let harness = TestHarness::new().await;
    harness.service.refresh_cache().await.unwrap();

    let page = harness
        .service
        .get_media_inventory(1, SortInfo::new(SortKey::Name, SortOrder::Asc))
        .await
        .unwrap();
    assert!(!page.has_next_page);

    let summary: Vec<(&str, Decision)> = page
        .rows
        .iter()
        .map(|row| (row.id.as_str(), row.decision))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("movie-1", Decision::SafeToDelete),
            ("series-5", Decision::Pending),
        ]
    );
    assert!(page.rows.iter().all(|row| row.children.is_empty()));
    assert_eq!(page.rows[1].size, 30);
}

#[tokio::test]
async fn test_expanded_series_row() {
    let harness = TestHarness::new().await;

    let row = harness
        .service
        .get_expanded_media_row("series-5")
        .await
        .unwrap();
    assert_eq!(row.children.len(), 2);

    let season1 = &row.children[0];
    assert_eq!(season1.id, "series-5-s-1");
    assert_eq!(season1.decision, Decision::SafeToDelete);
    assert_eq!(season1.torrent.link_status, LinkStatus::Present);
    assert_eq!(season1.torrent.tracker.as_ref().unwrap().name, "fixture");
    assert!(season1.children.iter().all(|file| !file.allow_deletion));

    let season2 = &row.children[1];
    assert_eq!(season2.id, "series-5-s-2");
    assert_eq!(season2.decision, Decision::Pending);
    assert_eq!(season2.torrent.ratio, Some(0.2));
}

#[tokio::test]
async fn test_delete_season_then_refresh() {
    let harness = TestHarness::new().await;
    harness.service.refresh_cache().await.unwrap();

    harness.service.delete_media("series-5-s-1").await.unwrap();

    assert_eq!(
        harness.torrents.deleted().await,
        vec![("qbit".to_string(), "pack".to_string())]
    );
    assert_eq!(
        harness.media.deleted().await,
        vec![(MediaType::Series, vec![1, 2], true)]
    );

    let row = harness
        .service
        .get_expanded_media_row("series-5")
        .await
        .unwrap();
    let ids: Vec<&str> = row.children.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["series-5-s-2"]);
    assert_eq!(row.size, 10);

    // A failed refresh keeps serving the post-delete state
    harness
        .media
        .set_next_error(SourceError::ConnectionFailed("sonarr down".to_string()))
        .await;
    let err = harness.service.refresh_cache().await.unwrap_err();
    assert!(matches!(err, InventoryError::Refresh(_)));

    let row = harness
        .service
        .get_expanded_media_row("series-5")
        .await
        .unwrap();
    assert_eq!(row.children.len(), 1);
}

#[tokio::test]
async fn test_delete_whole_title() {
    let harness = TestHarness::new().await;
    harness.service.refresh_cache().await.unwrap();

    harness.service.delete_media("movie-1").await.unwrap();

    assert_eq!(
        harness.torrents.deleted().await,
        vec![("qbit".to_string(), "alpha".to_string())]
    );
    let err = harness
        .service
        .get_expanded_media_row("movie-1")
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::MediaNotFound(_)));
}
