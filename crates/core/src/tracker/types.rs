//! Tracker types.

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;

/// Errors from tracker resolution.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("No tracker configured for {0:?}")]
    NotFound(Vec<String>),

    #[error("Invalid tracker pattern for {name}: {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Minimum age of {hours} hours for {name} is out of range")]
    InvalidMinAge { name: String, hours: u64 },

    #[error("Tracker resolution failed: {0}")]
    Internal(String),
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound(_))
    }
}

/// Retention rule of a tracker: how long and how much a torrent must seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracker {
    pub name: String,
    /// Minimum upload/download ratio.
    pub min_ratio: f64,
    /// Minimum time since the torrent was added.
    #[serde(rename = "min_age_secs", with = "duration_secs")]
    pub min_age: Duration,
}

/// Maps the tracker host names of a torrent to its governing tracker.
pub trait TrackerResolver: Send + Sync {
    /// Returns `TrackerError::NotFound` when no configured tracker applies.
    fn resolve(&self, tracker_names: &[String]) -> Result<Tracker, TrackerError>;
}

/// Serialize a `chrono::Duration` as whole seconds.
pub mod duration_secs {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }
}

/// Serialize an optional `chrono::Duration` as whole seconds.
pub mod option_duration_secs {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.num_seconds()),
            None => serializer.serialize_none(),
        }
    }
}
