//! Deluge torrent source over the Web UI JSON-RPC endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::TorrentClientConfig;
use crate::source::SourceError;

use super::{TorrentEntry, TorrentFile, TorrentSource};

/// Deluge reports this code when the session cookie is missing or expired.
const NOT_AUTHENTICATED: i64 = 1;

/// Status fields requested per torrent.
const STATUS_FIELDS: [&str; 6] = [
    "name",
    "ratio",
    "completed_time",
    "time_added",
    "tracker_host",
    "files",
];

/// Torrent source backed by a Deluge Web UI.
///
/// Only seeding torrents are reported. The Web UI authenticates with the
/// password alone; `username` is ignored.
pub struct DelugeSource {
    client: Client,
    config: TorrentClientConfig,
    dry_run: bool,
    /// Set once the cookie jar holds a session bound to a daemon.
    authenticated: RwLock<bool>,
    next_id: AtomicU64,
}

impl DelugeSource {
    /// Create a new source. No request is made until first use.
    pub fn new(config: TorrentClientConfig, dry_run: bool) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            config,
            dry_run,
            authenticated: RwLock::new(false),
            next_id: AtomicU64::new(1),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/json", self.config.url.trim_end_matches('/'))
    }

    /// One JSON-RPC round trip, without session handling.
    async fn call_raw(&self, method: &str, params: Value) -> Result<RpcResponse, SourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .post(self.endpoint())
            .json(&json!({ "method": method, "params": params, "id": id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::ApiError(format!("HTTP {} on {}", status, method)));
        }
        response.json().await.map_err(|e| {
            SourceError::ApiError(format!("Failed to parse {} response: {}", method, e))
        })
    }

    async fn login(&self) -> Result<(), SourceError> {
        let logged_in: bool = self
            .call_raw("auth.login", json!([self.config.password]))
            .await?
            .into_result("auth.login")?;
        if !logged_in {
            return Err(SourceError::AuthenticationFailed(format!(
                "invalid password for client {}",
                self.config.name
            )));
        }

        let connected: bool = self
            .call_raw("web.connected", json!([]))
            .await?
            .into_result("web.connected")?;
        if !connected {
            self.connect_first_host().await?;
        }

        debug!("Deluge login successful for client {}", self.config.name);
        *self.authenticated.write().await = true;
        Ok(())
    }

    /// Bind the Web UI session to its first configured daemon.
    async fn connect_first_host(&self) -> Result<(), SourceError> {
        let hosts: Vec<Vec<Value>> = self
            .call_raw("web.get_hosts", json!([]))
            .await?
            .into_result("web.get_hosts")?;
        let host_id = hosts
            .first()
            .and_then(|host| host.first())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SourceError::ConnectionFailed(format!(
                    "no daemon configured in the Web UI of client {}",
                    self.config.name
                ))
            })?
            .to_string();

        info!(
            "Connecting Deluge client {} to daemon {}",
            self.config.name, host_id
        );
        self.call_raw("web.connect", json!([host_id]))
            .await?
            .into_result::<Value>("web.connect")?;
        Ok(())
    }

    /// Call a method, logging in first and once more if the session expired.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, SourceError> {
        if !*self.authenticated.read().await {
            self.login().await?;
        }

        let mut response = self.call_raw(method, params.clone()).await?;
        if response.error_code() == Some(NOT_AUTHENTICATED) {
            warn!(
                "Deluge session expired for client {}, re-authenticating",
                self.config.name
            );
            *self.authenticated.write().await = false;
            self.login().await?;
            response = self.call_raw(method, params).await?;
        }
        response.into_result(method)
    }

    async fn exists(&self, hash: &str) -> Result<bool, SourceError> {
        let status: HashMap<String, Value> = self
            .call("core.get_torrent_status", json!([hash, ["name"]]))
            .await?;
        Ok(!status.is_empty())
    }
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

impl RpcResponse {
    fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|e| e.code)
    }

    fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T, SourceError> {
        if let Some(error) = self.error {
            return Err(match error.code {
                NOT_AUTHENTICATED => SourceError::AuthenticationFailed(error.message),
                _ if error.message.contains("InvalidTorrentError") => {
                    SourceError::NotFound(error.message)
                }
                _ => SourceError::ApiError(format!("{} failed: {}", method, error.message)),
            });
        }
        serde_json::from_value(self.result)
            .map_err(|e| SourceError::ApiError(format!("Failed to parse {} result: {}", method, e)))
    }
}

/// `core.get_torrents_status` value.
#[derive(Debug, Deserialize)]
struct DelugeTorrent {
    name: String,
    #[serde(default)]
    ratio: f64,
    #[serde(default)]
    completed_time: f64,
    #[serde(default)]
    time_added: f64,
    #[serde(default)]
    tracker_host: String,
    #[serde(default)]
    files: Vec<DelugeFile>,
}

#[derive(Debug, Deserialize)]
struct DelugeFile {
    path: String,
    size: u64,
}

impl DelugeTorrent {
    fn into_entry(self, client: &str, hash: &str) -> TorrentEntry {
        // Torrents added before completion tracking report 0.
        let seeding_since = if self.completed_time > 0.0 {
            self.completed_time
        } else {
            self.time_added
        };
        TorrentEntry {
            client: client.to_string(),
            id: hash.to_lowercase(),
            name: self.name,
            // Deluge reports -1 before anything was downloaded.
            ratio: self.ratio.max(0.0),
            added: seconds_to_datetime(seeding_since),
            trackers: if self.tracker_host.is_empty() {
                Vec::new()
            } else {
                vec![self.tracker_host]
            },
            files: self
                .files
                .into_iter()
                .map(|f| TorrentFile {
                    path: f.path,
                    size: f.size,
                })
                .collect(),
        }
    }
}

/// Entries sorted oldest first, ties broken by hash.
fn torrent_entries(client: &str, status: HashMap<String, DelugeTorrent>) -> Vec<TorrentEntry> {
    let mut entries: Vec<TorrentEntry> = status
        .into_iter()
        .map(|(hash, torrent)| torrent.into_entry(client, &hash))
        .collect();
    entries.sort_by(|a, b| a.added.cmp(&b.added).then_with(|| a.id.cmp(&b.id)));
    entries
}

/// Convert fractional Unix seconds, mapping missing values to the epoch.
fn seconds_to_datetime(seconds: f64) -> DateTime<Utc> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return DateTime::UNIX_EPOCH;
    }
    Utc.timestamp_opt(seconds as i64, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[async_trait]
impl TorrentSource for DelugeSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn get_torrent_entries(&self) -> Result<Vec<TorrentEntry>, SourceError> {
        let status: HashMap<String, DelugeTorrent> = self
            .call(
                "core.get_torrents_status",
                json!([{ "state": "Seeding" }, STATUS_FIELDS]),
            )
            .await?;
        debug!(
            "Deluge client {} reported {} seeding torrents",
            self.config.name,
            status.len()
        );
        Ok(torrent_entries(&self.config.name, status))
    }

    async fn delete_torrent(&self, id: &str) -> Result<(), SourceError> {
        let hash = id.to_lowercase();
        if !self.exists(&hash).await? {
            return Err(SourceError::NotFound(format!(
                "torrent {} on client {}",
                hash, self.config.name
            )));
        }

        if self.dry_run {
            info!(
                "[DRY RUN] Skipping torrent deletion for {} on client {}",
                hash, self.config.name
            );
            return Ok(());
        }

        let removed: bool = self
            .call("core.remove_torrent", json!([hash, true]))
            .await?;
        if !removed {
            return Err(SourceError::ApiError(format!(
                "client {} refused to remove torrent {}",
                self.config.name, hash
            )));
        }
        Ok(())
    }
}
