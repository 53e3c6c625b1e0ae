use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::clock::Clock;
use crate::torrent::TorrentEntry;
use crate::tracker::{Tracker, TrackerResolver};

use super::{Decision, EvaluationReport, EvaluationReportPart, InventoryError, LinkedMedia};

/// Decides which files of a title can be deleted.
pub trait RetentionPolicy: Send + Sync {
    fn evaluate(&self, media: &LinkedMedia) -> Result<EvaluationReport, InventoryError>;
}

/// Keeps files whose torrent has not yet met its tracker's ratio and age.
pub struct TrackerRetentionPolicy {
    resolver: Arc<dyn TrackerResolver>,
    clock: Arc<dyn Clock>,
}

impl TrackerRetentionPolicy {
    pub fn new(resolver: Arc<dyn TrackerResolver>, clock: Arc<dyn Clock>) -> Self {
        Self { resolver, clock }
    }

    fn seeded_enough(&self, torrent: &TorrentEntry, tracker: &Tracker) -> bool {
        torrent.ratio >= tracker.min_ratio
            && torrent
                .added
                .checked_add_signed(tracker.min_age)
                .is_some_and(|ready| self.clock.now() >= ready)
    }
}

impl RetentionPolicy for TrackerRetentionPolicy {
    fn evaluate(&self, media: &LinkedMedia) -> Result<EvaluationReport, InventoryError> {
        let mut files = BTreeMap::new();

        for linked in &media.files {
            let part = match &linked.torrent {
                None => EvaluationReportPart {
                    decision: Decision::SafeToDelete,
                    tracker: None,
                },
                Some(torrent) => match self.resolver.resolve(&torrent.trackers) {
                    Ok(tracker) => EvaluationReportPart {
                        decision: if self.seeded_enough(torrent, &tracker) {
                            Decision::SafeToDelete
                        } else {
                            Decision::Pending
                        },
                        tracker: Some(tracker),
                    },
                    Err(e) if e.is_not_found() => {
                        warn!(
                            "Tracker not found for linked media file {:?} of {:?} (trackers: {:?})",
                            linked.file.original_file_path, media.metadata.title, torrent.trackers
                        );
                        EvaluationReportPart {
                            decision: Decision::Pending,
                            tracker: None,
                        }
                    }
                    Err(e) => {
                        return Err(InventoryError::Evaluation {
                            file: format!(
                                "{:?} of {:?}",
                                linked.file.original_file_path, media.metadata.title
                            ),
                            source: e,
                        })
                    }
                },
            };
            files.insert(linked.file.id, part);
        }

        Ok(EvaluationReport::from_file_parts(media, files))
    }
}
