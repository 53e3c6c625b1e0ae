//! Types for media library operations.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::{CachedManager, SourceError};

/// Kind of title tracked by a media manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    /// Returns the string representation used in ids and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }

    /// Parse the string form produced by [`MediaType::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaType::Movie),
            "series" => Some(MediaType::Series),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive data of a title. `(media_type, id)` identifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    /// Link to the title in the managing application.
    pub url: String,
    pub added: DateTime<Utc>,
}

/// A file on disk belonging to a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Unique within the parent title.
    pub id: i64,
    /// Season number; `-1` or `0` means the file has no season.
    pub season: i32,
    pub original_file_path: String,
    pub size: u64,
}

impl MediaFile {
    /// Whether the file takes part in season grouping.
    pub fn has_season(&self) -> bool {
        self.season > 0
    }
}

/// A title together with its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    #[serde(flatten)]
    pub metadata: MediaMetadata,
    pub files: Vec<MediaFile>,
}

/// One media backend, serving a single media type.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Media type this source is responsible for.
    fn supported_media_type(&self) -> MediaType;

    /// Fetch every title with files on disk.
    async fn get_media(&self) -> Result<Vec<MediaEntry>, SourceError>;

    /// Delete files by id.
    /// If `stop_parent_monitoring` is true, the owning titles stop being monitored.
    async fn delete_media_files(
        &self,
        file_ids: &[i64],
        stop_parent_monitoring: bool,
    ) -> Result<(), SourceError>;
}

/// Aggregates all media sources behind one cached view.
#[async_trait]
pub trait MediaSourceManager: CachedManager {
    /// All known titles across sources.
    async fn get_media(&self) -> Result<Vec<MediaEntry>, SourceError>;

    /// Delete files of the given media type.
    async fn delete_media_files(
        &self,
        media_type: MediaType,
        file_ids: &[i64],
        stop_parent_monitoring: bool,
    ) -> Result<(), SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_as_str() {
        assert_eq!(MediaType::Movie.as_str(), "movie");
        assert_eq!(MediaType::Series.as_str(), "series");
        assert_eq!(MediaType::Series.to_string(), "series");
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!(MediaType::parse("movie"), Some(MediaType::Movie));
        assert_eq!(MediaType::parse("series"), Some(MediaType::Series));
        assert_eq!(MediaType::parse("film"), None);
        assert_eq!(MediaType::parse("Movie"), None);
    }

    #[test]
    fn test_media_file_has_season() {
        let mut file = MediaFile {
            id: 1,
            season: -1,
            original_file_path: "a.mkv".to_string(),
            size: 1,
        };
        assert!(!file.has_season());
        file.season = 0;
        assert!(!file.has_season());
        file.season = 3;
        assert!(file.has_season());
    }

    #[test]
    fn test_media_entry_serialization_flattens_metadata() {
        let entry = MediaEntry {
            metadata: MediaMetadata {
                id: 1337,
                media_type: MediaType::Movie,
                title: "Some Movie".to_string(),
                url: "http://radarr/movie/1337".to_string(),
                added: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            },
            files: vec![],
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 1337);
        assert_eq!(json["media_type"], "movie");

        let parsed: MediaEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }
}
