use std::collections::HashSet;

use regex_lite::Regex;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Snapshot replay and persistence are not both enabled
/// - Tracker patterns compile, ratios are not negative and minimum ages fit a duration
/// - Torrent client names are unique
/// - At least one media manager is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.inventory.use_cached_copy && config.inventory.persist {
        return Err(ConfigError::ValidationError(
            "inventory.use_cached_copy and inventory.persist are mutually exclusive".to_string(),
        ));
    }

    for tracker in &config.trackers {
        if let Err(e) = Regex::new(&tracker.pattern) {
            return Err(ConfigError::ValidationError(format!(
                "tracker {:?} has an invalid pattern: {}",
                tracker.name, e
            )));
        }
        if tracker.min_ratio.is_nan() || tracker.min_ratio < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "tracker {:?} min_ratio must be >= 0",
                tracker.name
            )));
        }
        if tracker.min_age().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "tracker {:?} min_age_hours {} is out of range",
                tracker.name, tracker.min_age_hours
            )));
        }
    }

    let mut names = HashSet::new();
    for client in &config.torrent_clients {
        if !names.insert(client.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate torrent client name {:?}",
                client.name
            )));
        }
    }

    if config.media.sonarr.is_none() && config.media.radarr.is_none() {
        return Err(ConfigError::ValidationError(
            "at least one of media.sonarr or media.radarr must be configured".to_string(),
        ));
    }

    Ok(())
}
