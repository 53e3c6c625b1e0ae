//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the media and torrent managers, the tracker resolver
//! and the clock, so the inventory can be exercised without Sonarr, Radarr
//! or a torrent client.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedwarden_core::testing::{fixtures, MockMediaManager, MockTorrentManager};
//!
//! let media = MockMediaManager::new();
//! let torrents = MockTorrentManager::new();
//!
//! media.set_media(vec![fixtures::movie(1, "Alpha", &[(10, "alpha.mkv", 100)])]).await;
//! torrents.set_torrents(vec![fixtures::torrent("qbit", "a", "alpha.mkv", 1.0, 3)]).await;
//!
//! // Hand both to an InventoryService...
//! ```

mod mock_media_manager;
mod mock_torrent_manager;
mod mock_tracker_resolver;

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

pub use mock_media_manager::{MockMediaManager, RecordedMediaDeletion};
pub use mock_torrent_manager::MockTorrentManager;
pub use mock_tracker_resolver::MockTrackerResolver;

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut current) = self.now.write() {
            *current = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.now.write() {
            *current += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::media::{MediaEntry, MediaFile, MediaMetadata, MediaType};
    use crate::torrent::{TorrentEntry, TorrentFile};
    use crate::tracker::Tracker;

    /// Host every fixture torrent announces to.
    pub const TRACKER_HOST: &str = "tracker.org";

    /// The instant fixtures are built around: 2025-06-15T12:00:00Z.
    pub fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_749_988_800, 0).unwrap_or_default()
    }

    /// A movie with `(file id, path, size)` files, added 30 days ago.
    pub fn movie(id: i64, title: &str, files: &[(i64, &str, u64)]) -> MediaEntry {
        MediaEntry {
            metadata: metadata(MediaType::Movie, id, title),
            files: files
                .iter()
                .map(|(file_id, path, size)| MediaFile {
                    id: *file_id,
                    season: -1,
                    original_file_path: path.to_string(),
                    size: *size,
                })
                .collect(),
        }
    }

    /// A series with `(file id, season, path, size)` files, added 30 days ago.
    pub fn series(id: i64, title: &str, files: &[(i64, i32, &str, u64)]) -> MediaEntry {
        MediaEntry {
            metadata: metadata(MediaType::Series, id, title),
            files: files
                .iter()
                .map(|(file_id, season, path, size)| MediaFile {
                    id: *file_id,
                    season: *season,
                    original_file_path: path.to_string(),
                    size: *size,
                })
                .collect(),
        }
    }

    /// A single-file torrent named after `file_path`, so it links by name.
    pub fn torrent(
        client: &str,
        id: &str,
        file_path: &str,
        ratio: f64,
        age_days: i64,
    ) -> TorrentEntry {
        TorrentEntry {
            client: client.to_string(),
            id: id.to_string(),
            name: file_path.to_string(),
            ratio,
            added: now() - Duration::days(age_days),
            trackers: vec![TRACKER_HOST.to_string()],
            files: vec![TorrentFile {
                path: file_path.to_string(),
                size: 0,
            }],
        }
    }

    /// A multi-file torrent whose files link by path and size.
    pub fn season_pack(client: &str, id: &str, files: &[(&str, u64)]) -> TorrentEntry {
        TorrentEntry {
            client: client.to_string(),
            id: id.to_string(),
            name: id.to_string(),
            ratio: 1.0,
            added: now() - Duration::days(7),
            trackers: vec![TRACKER_HOST.to_string()],
            files: files
                .iter()
                .map(|(path, size)| TorrentFile {
                    path: path.to_string(),
                    size: *size,
                })
                .collect(),
        }
    }

    pub fn tracker(name: &str, min_ratio: f64, min_age_hours: i64) -> Tracker {
        Tracker {
            name: name.to_string(),
            min_ratio,
            min_age: Duration::hours(min_age_hours),
        }
    }

    fn metadata(media_type: MediaType, id: i64, title: &str) -> MediaMetadata {
        MediaMetadata {
            id,
            media_type,
            title: title.to_string(),
            url: format!("http://localhost/{}/{}", media_type.as_str(), id),
            added: now() - Duration::days(30),
        }
    }
}
