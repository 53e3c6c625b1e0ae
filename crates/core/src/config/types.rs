use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Log destructive calls instead of performing them.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// Retention rules, tried in order.
    #[serde(default)]
    pub trackers: Vec<TrackerConfig>,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub torrent_clients: Vec<TorrentClientConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Inventory cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InventoryConfig {
    /// Directory holding manager snapshots (default: "./cache").
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Serve refreshes from the on-disk snapshots instead of the backends.
    #[serde(default)]
    pub use_cached_copy: bool,
    /// Write manager snapshots to disk after every live refresh.
    #[serde(default)]
    pub persist: bool,
    /// Deadline for each manager call in seconds, 0 disables it (default: 120).
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
}

impl InventoryConfig {
    /// Deadline applied to manager calls, if any.
    pub fn source_timeout(&self) -> Option<Duration> {
        (self.source_timeout_secs > 0).then(|| Duration::from_secs(self.source_timeout_secs))
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            use_cached_copy: false,
            persist: false,
            source_timeout_secs: default_source_timeout(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_source_timeout() -> u64 {
    120
}

/// Retention rule for a tracker
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    pub name: String,
    /// Regex matched against tracker host names.
    pub pattern: String,
    /// Minimum seed ratio before files are safe to delete.
    pub min_ratio: f64,
    /// Minimum seed time in hours before files are safe to delete.
    pub min_age_hours: u64,
}

impl TrackerConfig {
    /// Minimum seed time, or `None` when the hour count does not fit a duration.
    pub fn min_age(&self) -> Option<chrono::Duration> {
        i64::try_from(self.min_age_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
    }
}

/// Media library managers
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub sonarr: Option<ArrConfig>,
    #[serde(default)]
    pub radarr: Option<ArrConfig>,
}

/// Sonarr/Radarr connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArrConfig {
    /// Base URL (e.g., "http://localhost:8989")
    pub url: String,
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Available torrent client backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TorrentClientBackend {
    QBittorrent,
    Deluge,
}

impl TorrentClientBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentClientBackend::QBittorrent => "qbittorrent",
            TorrentClientBackend::Deluge => "deluge",
        }
    }
}

/// Torrent client connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TorrentClientConfig {
    /// Unique client name, used to address torrents.
    pub name: String,
    pub backend: TorrentClientBackend,
    /// Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub dry_run: bool,
    pub server: ServerConfig,
    pub inventory: InventoryConfig,
    pub trackers: Vec<TrackerConfig>,
    pub media: SanitizedMediaConfig,
    pub torrent_clients: Vec<SanitizedTorrentClientConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMediaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sonarr: Option<SanitizedArrConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radarr: Option<SanitizedArrConfig>,
}

/// Sanitized *arr config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedArrConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&ArrConfig> for SanitizedArrConfig {
    fn from(config: &ArrConfig) -> Self {
        Self {
            url: config.url.clone(),
            api_key_configured: !config.api_key.is_empty(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Sanitized torrent client config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTorrentClientConfig {
    pub name: String,
    pub backend: String,
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            server: config.server.clone(),
            inventory: config.inventory.clone(),
            trackers: config.trackers.clone(),
            media: SanitizedMediaConfig {
                sonarr: config.media.sonarr.as_ref().map(SanitizedArrConfig::from),
                radarr: config.media.radarr.as_ref().map(SanitizedArrConfig::from),
            },
            torrent_clients: config
                .torrent_clients
                .iter()
                .map(|c| SanitizedTorrentClientConfig {
                    name: c.name.clone(),
                    backend: c.backend.as_str().to_string(),
                    url: c.url.clone(),
                    username: c.username.clone(),
                    password_configured: !c.password.is_empty(),
                    timeout_secs: c.timeout_secs,
                })
                .collect(),
        }
    }
}
