//! Types for the inventory engine.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::media::{MediaFile, MediaMetadata, MediaType};
use crate::source::SourceError;
use crate::torrent::TorrentEntry;
use crate::tracker::{Tracker, TrackerError};

/// Errors from inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Malformed media id: {0:?}")]
    MalformedId(String),

    #[error("Media not found: {0}")]
    MediaNotFound(String),

    #[error("{stage} failed: {source}")]
    Source {
        stage: String,
        #[source]
        source: SourceError,
    },

    #[error("Refresh cache failed: {}", join_failures(.0))]
    Refresh(Vec<RefreshFailure>),

    #[error("Could not resolve tracker for linked media file {file}: {source}")]
    Evaluation {
        file: String,
        #[source]
        source: TrackerError,
    },

    #[error("{stage} timed out")]
    Timeout { stage: String },

    #[error("Cache file {}: {source}", path.display())]
    CacheFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// One failed branch of a cache refresh.
#[derive(Debug, Error)]
#[error("{manager}: {error}")]
pub struct RefreshFailure {
    /// Identity of the manager whose refresh failed.
    pub manager: &'static str,
    #[source]
    pub error: InventoryError,
}

fn join_failures(failures: &[RefreshFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A media file with the torrent it was downloaded by, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedMediaFile {
    pub file: MediaFile,
    pub torrent: Option<Arc<TorrentEntry>>,
}

/// A title whose files have been correlated with torrents.
///
/// `files` keeps the order of the underlying `MediaEntry::files`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedMedia {
    pub metadata: MediaMetadata,
    pub files: Vec<LinkedMediaFile>,
}

/// Retention verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    SafeToDelete,
    Pending,
}

impl Decision {
    /// The stricter of two decisions.
    pub fn worst(self, other: Decision) -> Decision {
        if self == Decision::Pending || other == Decision::Pending {
            Decision::Pending
        } else {
            Decision::SafeToDelete
        }
    }

    /// Sort score, lower sorts first ascending.
    pub fn score(self) -> u8 {
        match self {
            Decision::SafeToDelete => 0,
            Decision::Pending => 1,
        }
    }
}

/// Verdict for one level of a title: a file, a season or the whole title.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReportPart {
    pub decision: Decision,
    /// Present only when every file below resolved to the same tracker.
    pub tracker: Option<Tracker>,
}

impl EvaluationReportPart {
    /// Fold parts with worst-of decisions and tracker uniformity.
    /// Returns `None` for an empty input.
    pub fn fold<'a>(parts: impl IntoIterator<Item = &'a EvaluationReportPart>) -> Option<Self> {
        let mut folded: Option<EvaluationReportPart> = None;
        for part in parts {
            match folded.as_mut() {
                None => folded = Some(part.clone()),
                Some(acc) => {
                    acc.decision = acc.decision.worst(part.decision);
                    if acc.tracker != part.tracker {
                        acc.tracker = None;
                    }
                }
            }
        }
        folded
    }
}

/// Verdict tree for one title.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub result: EvaluationReportPart,
    /// Season number to verdict. Empty for movies.
    pub seasons: BTreeMap<i32, EvaluationReportPart>,
    /// File id to verdict.
    pub files: BTreeMap<i64, EvaluationReportPart>,
}

impl EvaluationReport {
    /// Build the season and title levels from per-file verdicts.
    ///
    /// `files` must hold a part for every file of `media`.
    pub fn from_file_parts(
        media: &LinkedMedia,
        files: BTreeMap<i64, EvaluationReportPart>,
    ) -> Self {
        let ordered = || media.files.iter().filter_map(|f| files.get(&f.file.id));

        let result = EvaluationReportPart::fold(ordered()).unwrap_or(EvaluationReportPart {
            decision: Decision::SafeToDelete,
            tracker: None,
        });

        let mut seasons = BTreeMap::new();
        if media.metadata.media_type == MediaType::Series {
            let numbers: BTreeSet<i32> = media
                .files
                .iter()
                .filter(|f| f.file.has_season())
                .map(|f| f.file.season)
                .collect();
            for season in numbers {
                let members = media
                    .files
                    .iter()
                    .filter(|f| f.file.season == season)
                    .filter_map(|f| files.get(&f.file.id));
                if let Some(part) = EvaluationReportPart::fold(members) {
                    seasons.insert(season, part);
                }
            }
        }

        Self {
            result,
            seasons,
            files,
        }
    }
}

/// Cached unit: a linked title with its verdicts and derived values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedMedia {
    pub linked: LinkedMedia,
    pub report: EvaluationReport,
    /// Sum of file sizes.
    pub size: u64,
    /// Latest of the title's added time and its linked torrents' added times.
    pub added: DateTime<Utc>,
}

impl EnrichedMedia {
    pub fn new(linked: LinkedMedia, report: EvaluationReport) -> Self {
        let size = linked.files.iter().map(|f| f.file.size).sum();
        let added = linked
            .files
            .iter()
            .filter_map(|f| f.torrent.as_ref().map(|t| t.added))
            .fold(linked.metadata.added, |latest, added| latest.max(added));
        Self {
            linked,
            report,
            size,
            added,
        }
    }

    pub fn is(&self, media_type: MediaType, id: i64) -> bool {
        self.linked.metadata.media_type == media_type && self.linked.metadata.id == id
    }

    /// Drop the files matching `remove`, keeping the order of the rest and
    /// rebuilding the derived values.
    pub fn without_files(&self, remove: impl Fn(&MediaFile) -> bool) -> Self {
        let linked = LinkedMedia {
            metadata: self.linked.metadata.clone(),
            files: self
                .linked
                .files
                .iter()
                .filter(|f| !remove(&f.file))
                .cloned()
                .collect(),
        };
        let parts = self
            .report
            .files
            .iter()
            .filter(|(id, _)| linked.files.iter().any(|f| f.file.id == **id))
            .map(|(id, part)| (*id, part.clone()))
            .collect();
        let report = EvaluationReport::from_file_parts(&linked, parts);
        Self::new(linked, report)
    }
}

/// Column used to order the inventory listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Added,
    #[serde(alias = "torrent_status")]
    Status,
    /// Anything else; leaves the order unchanged.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortInfo {
    #[serde(default)]
    pub key: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortInfo {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    pub(crate) fn compare(&self, a: &EnrichedMedia, b: &EnrichedMedia) -> std::cmp::Ordering {
        let ordering = match self.key {
            SortKey::Name => a
                .linked
                .metadata
                .title
                .to_lowercase()
                .cmp(&b.linked.metadata.title.to_lowercase()),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Added => a.added.cmp(&b.added),
            SortKey::Status => a
                .report
                .result
                .decision
                .score()
                .cmp(&b.report.result.decision.score()),
            SortKey::Unknown => std::cmp::Ordering::Equal,
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    pub(crate) fn warn_if_unknown(&self) {
        if self.key == SortKey::Unknown {
            warn!("Received unknown sort key, keeping original order");
        }
    }
}

/// Whether the files of a row are backed by torrents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Present,
    Missing,
    /// Some files are linked, some are not.
    Incomplete,
}

impl LinkStatus {
    pub fn combine(self, other: LinkStatus) -> LinkStatus {
        if self == other {
            self
        } else {
            LinkStatus::Incomplete
        }
    }
}

/// Torrent side of a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorrentInformation {
    pub link_status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<Tracker>,
    /// Absent when mixed or unknown.
    pub ratio: Option<f64>,
    /// Seeding time. Absent when mixed or unknown.
    #[serde(
        rename = "age_secs",
        serialize_with = "crate::tracker::option_duration_secs::serialize"
    )]
    pub age: Option<Duration>,
}

impl TorrentInformation {
    /// Same link, ratio and age, ignoring the tracker.
    pub(crate) fn same_torrent_as(&self, other: &TorrentInformation) -> bool {
        self.link_status == other.link_status && self.ratio == other.ratio && self.age == other.age
    }
}

/// Presentation-ready view of a title, season or file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRow {
    /// Composite id addressing this row.
    pub id: String,
    pub media_type: MediaType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub size: u64,
    pub added: Option<DateTime<Utc>>,
    pub torrent: TorrentInformation,
    pub decision: Decision,
    pub allow_deletion: bool,
    pub children: Vec<MediaRow>,
}

/// One page of the inventory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryPage {
    pub rows: Vec<MediaRow>,
    pub has_next_page: bool,
    pub page: usize,
}
