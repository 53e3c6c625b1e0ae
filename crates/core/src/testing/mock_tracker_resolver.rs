//! Mock tracker resolver for testing.

use std::sync::{Arc, RwLock};

use crate::tracker::{Tracker, TrackerError, TrackerResolver};

/// Resolves trackers by exact host name.
///
/// Registered hosts are tried in registration order.
#[derive(Debug, Default)]
pub struct MockTrackerResolver {
    trackers: Arc<RwLock<Vec<(String, Tracker)>>>,
    next_error: Arc<RwLock<Option<TrackerError>>>,
}

impl MockTrackerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `host` to `tracker`.
    pub fn add_tracker(&self, host: &str, tracker: Tracker) {
        if let Ok(mut trackers) = self.trackers.write() {
            trackers.push((host.to_string(), tracker));
        }
    }

    /// Make the next resolution fail.
    pub fn set_next_error(&self, error: TrackerError) {
        if let Ok(mut next) = self.next_error.write() {
            *next = Some(error);
        }
    }
}

impl TrackerResolver for MockTrackerResolver {
    fn resolve(&self, tracker_names: &[String]) -> Result<Tracker, TrackerError> {
        if let Some(error) = self
            .next_error
            .write()
            .map_err(|e| TrackerError::Internal(e.to_string()))?
            .take()
        {
            return Err(error);
        }

        let trackers = self
            .trackers
            .read()
            .map_err(|e| TrackerError::Internal(e.to_string()))?;
        trackers
            .iter()
            .find(|(host, _)| tracker_names.iter().any(|name| name == host))
            .map(|(_, tracker)| tracker.clone())
            .ok_or_else(|| TrackerError::NotFound(tracker_names.to_vec()))
    }
}
