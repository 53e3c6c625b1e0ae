use regex_lite::Regex;

use crate::config::TrackerConfig;

use super::{Tracker, TrackerError, TrackerResolver};

/// Resolves trackers by matching host names against configured patterns.
///
/// Trackers are tried in configuration order; the first one whose pattern
/// matches any of the supplied names wins.
pub struct PatternTrackerResolver {
    trackers: Vec<(Regex, Tracker)>,
}

impl PatternTrackerResolver {
    pub fn new(configs: &[TrackerConfig]) -> Result<Self, TrackerError> {
        let trackers = configs
            .iter()
            .map(|config| {
                let regex =
                    Regex::new(&config.pattern).map_err(|e| TrackerError::InvalidPattern {
                        name: config.name.clone(),
                        reason: e.to_string(),
                    })?;
                let min_age = config.min_age().ok_or_else(|| TrackerError::InvalidMinAge {
                    name: config.name.clone(),
                    hours: config.min_age_hours,
                })?;
                Ok((
                    regex,
                    Tracker {
                        name: config.name.clone(),
                        min_ratio: config.min_ratio,
                        min_age,
                    },
                ))
            })
            .collect::<Result<Vec<_>, TrackerError>>()?;
        Ok(Self { trackers })
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

impl TrackerResolver for PatternTrackerResolver {
    fn resolve(&self, tracker_names: &[String]) -> Result<Tracker, TrackerError> {
        self.trackers
            .iter()
            .find(|(regex, _)| tracker_names.iter().any(|name| regex.is_match(name)))
            .map(|(_, tracker)| tracker.clone())
            .ok_or_else(|| TrackerError::NotFound(tracker_names.to_vec()))
    }
}
