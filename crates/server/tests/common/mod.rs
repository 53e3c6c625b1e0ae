//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with mock managers behind a real inventory service, so the HTTP surface
//! can be exercised without Sonarr, Radarr or qBittorrent.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use seedwarden_core::{
    inventory::{DiskCache, PathLinker, TrackerRetentionPolicy},
    load_config_from_str,
    testing::{FixedClock, MockMediaManager, MockTorrentManager, MockTrackerResolver},
    InventoryService,
};
use seedwarden_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use seedwarden_core::testing::fixtures;

const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[media.radarr]
url = "http://radarr.local"
api_key = "secret-key"

[[torrent_clients]]
name = "qbit"
backend = "qbittorrent"
url = "http://qbit.local"
username = "admin"
password = "hunter2"
"#;

/// Test fixture for API testing with mock managers.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_listing() {
///     let fixture = TestFixture::new().await;
///     fixture.media.set_media(vec![fixtures::movie(1, "Alpha", &[(10, "a.mkv", 1)])]).await;
///
///     let response = fixture.get("/api/v1/media").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock media manager - configure titles and files
    pub media: Arc<MockMediaManager>,
    /// Mock torrent manager - configure torrents
    pub torrents: Arc<MockTorrentManager>,
    /// Mock tracker resolver - configure retention rules
    pub resolver: Arc<MockTrackerResolver>,
    /// Snapshot directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with empty mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = load_config_from_str(TEST_CONFIG).expect("Failed to parse test config");

        let media = Arc::new(MockMediaManager::new());
        let torrents = Arc::new(MockTorrentManager::new());
        let resolver = Arc::new(MockTrackerResolver::new());
        let clock = Arc::new(FixedClock::new(fixtures::now()));

        let inventory = InventoryService::new(
            &config.inventory,
            media.clone(),
            torrents.clone(),
            Arc::new(PathLinker::new()),
            Arc::new(TrackerRetentionPolicy::new(resolver.clone(), clock.clone())),
            clock,
        )
        .with_disk_cache(DiskCache::new(temp_dir.path()));

        let state = Arc::new(AppState::new(config, Arc::new(inventory)));
        let router = create_router(state);

        Self {
            router,
            media,
            torrents,
            resolver,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
