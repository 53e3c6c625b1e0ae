//! qBittorrent torrent source over the Web API v2.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::TorrentClientConfig;
use crate::source::SourceError;

use super::{TorrentEntry, TorrentFile, TorrentSource};

/// Torrent source backed by a qBittorrent instance.
pub struct QBittorrentSource {
    client: Client,
    config: TorrentClientConfig,
    dry_run: bool,
    /// Set once the cookie jar holds a valid session.
    authenticated: RwLock<bool>,
}

impl QBittorrentSource {
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
        })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn login(&self) -> Result<(), SourceError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful for client {}", self.config.name);
            *self.authenticated.write().await = true;
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(SourceError::AuthenticationFailed(format!(
                "invalid credentials for client {}",
                self.config.name
            )))
        } else {
            Err(SourceError::AuthenticationFailed(format!(
                "unexpected login response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), SourceError> {
        if *self.authenticated.read().await {
            return Ok(());
        }
        self.login().await
    }

    /// Send a request, logging in again once if the session expired.
    async fn execute<F>(&self, build: F) -> Result<String, SourceError>
    where
        F: Fn() -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let mut response = build().send().await?;
        if response.status().as_u16() == 403 {
            warn!(
                "qBittorrent session expired for client {}, re-authenticating",
                self.config.name
            );
            *self.authenticated.write().await = false;
            self.login().await?;
            response = build().send().await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::ApiError(format!("HTTP {}", status)));
        }
        Ok(response.text().await?)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        let body = self
            .execute(|| self.client.get(&url).query(query))
            .await?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::ApiError(format!("Failed to parse response: {}", e)))
    }

    async fn post_form(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<(), SourceError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.execute(|| self.client.post(&url).form(params))
            .await
            .map(|_| ())
    }

    async fn torrent_entry(&self, info: QBTorrentInfo) -> Result<TorrentEntry, SourceError> {
        let hash = info.hash.to_lowercase();
        let trackers: Vec<QBTracker> = self
            .get("/api/v2/torrents/trackers", &[("hash", &hash)])
            .await?;
        let files: Vec<QBFile> = self
            .get("/api/v2/torrents/files", &[("hash", &hash)])
            .await?;

        Ok(info.into_entry(
            &self.config.name,
            tracker_hosts(trackers.iter().map(|t| t.url.as_str())),
            files
                .into_iter()
                .map(|f| TorrentFile {
                    path: f.name,
                    size: f.size.max(0) as u64,
                })
                .collect(),
        ))
    }
}

/// qBittorrent `torrents/info` item.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    ratio: f64,
    added_on: i64,
}

impl QBTorrentInfo {
    fn into_entry(
        self,
        client: &str,
        trackers: Vec<String>,
        files: Vec<TorrentFile>,
    ) -> TorrentEntry {
        TorrentEntry {
            client: client.to_string(),
            id: self.hash.to_lowercase(),
            name: self.name,
            ratio: self.ratio,
            added: timestamp_to_datetime(self.added_on),
            trackers,
            files,
        }
    }
}

/// qBittorrent `torrents/trackers` item.
#[derive(Debug, Deserialize)]
struct QBTracker {
    url: String,
}

/// qBittorrent `torrents/files` item.
#[derive(Debug, Deserialize)]
struct QBFile {
    name: String,
    size: i64,
}

/// Host names of real trackers, skipping DHT/PeX/LSD pseudo entries.
fn tracker_hosts<'a>(urls: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for url in urls {
        let Ok(parsed) = Url::parse(url) else {
            continue;
        };
        if let Some(host) = parsed.host_str() {
            if !hosts.iter().any(|h| h == host) {
                hosts.push(host.to_string());
            }
        }
    }
    hosts
}

/// Convert a Unix timestamp, mapping missing values to the epoch.
fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts.max(0), 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[async_trait]
impl TorrentSource for QBittorrentSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn get_torrent_entries(&self) -> Result<Vec<TorrentEntry>, SourceError> {
        // Oldest first; the linker takes the first matching torrent.
        let torrents: Vec<QBTorrentInfo> = self
            .get("/api/v2/torrents/info", &[("sort", "added_on")])
            .await?;
        debug!(
            "qBittorrent client {} reported {} torrents",
            self.config.name,
            torrents.len()
        );

        let mut entries = Vec::with_capacity(torrents.len());
        for info in torrents {
            entries.push(self.torrent_entry(info).await?);
        }
        Ok(entries)
    }

    async fn delete_torrent(&self, id: &str) -> Result<(), SourceError> {
        let hash = id.to_lowercase();
        let existing: Vec<QBTorrentInfo> = self
            .get("/api/v2/torrents/info", &[("hashes", &hash)])
            .await?;
        if existing.is_empty() {
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

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &hash), ("deleteFiles", "true")],
        )
        .await
    }
}
