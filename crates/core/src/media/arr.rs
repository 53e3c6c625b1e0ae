//! Sonarr/Radarr media source over the v3 REST API.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::ArrConfig;
use crate::source::SourceError;

use super::{MediaEntry, MediaFile, MediaMetadata, MediaSource, MediaType};

/// Which *arr application a source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrKind {
    /// Series manager.
    Sonarr,
    /// Movie manager.
    Radarr,
}

impl ArrKind {
    fn media_type(&self) -> MediaType {
        match self {
            ArrKind::Sonarr => MediaType::Series,
            ArrKind::Radarr => MediaType::Movie,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ArrKind::Sonarr => "sonarr",
            ArrKind::Radarr => "radarr",
        }
    }
}

/// Media source backed by a Sonarr or Radarr instance.
pub struct ArrSource {
    kind: ArrKind,
    client: Client,
    config: ArrConfig,
    dry_run: bool,
}

impl ArrSource {
    /// Create a new source.
    pub fn new(kind: ArrKind, config: ArrConfig, dry_run: bool) -> Result<Self, SourceError> {
        if config.api_key.is_empty() {
            return Err(SourceError::AuthenticationFailed(format!(
                "{} API key is required",
                kind.name()
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;
        Ok(Self {
            kind,
            client,
            config,
            dry_run,
        })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/api/v3{}", self.base_url(), endpoint);
        self.client
            .request(method, url)
            .header("X-Api-Key", &self.config.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, SourceError> {
        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(SourceError::AuthenticationFailed(format!(
                "invalid {} API key",
                self.kind.name()
            )));
        }
        if status.as_u16() == 404 {
            return Err(SourceError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(format!(
                "{} returned HTTP {}: {}",
                self.kind.name(),
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let response = self
            .send(self.request(Method::GET, endpoint).query(query))
            .await?;
        response.json().await.map_err(|e| {
            SourceError::ApiError(format!(
                "failed to parse {} response from {}: {}",
                self.kind.name(),
                endpoint,
                e
            ))
        })
    }

    async fn get_movies(&self) -> Result<Vec<MediaEntry>, SourceError> {
        let movies: Vec<RadarrMovie> = self.get_json("/movie", &[]).await?;
        let entries = movies
            .into_iter()
            .filter_map(|movie| {
                let file = movie.movie_file.filter(|_| movie.has_file)?;
                let path = file
                    .original_file_path
                    .filter(|p| !p.is_empty())
                    .unwrap_or(file.relative_path);
                Some(MediaEntry {
                    metadata: MediaMetadata {
                        id: movie.id,
                        media_type: MediaType::Movie,
                        title: movie.title,
                        url: format!("{}/movie/{}", self.base_url(), movie.tmdb_id),
                        added: movie.added,
                    },
                    files: vec![MediaFile {
                        id: file.id,
                        season: -1,
                        original_file_path: base_name(&path),
                        size: movie.size_on_disk.max(0) as u64,
                    }],
                })
            })
            .collect();
        Ok(entries)
    }

    async fn get_series(&self) -> Result<Vec<MediaEntry>, SourceError> {
        let series_list: Vec<SonarrSeries> = self.get_json("/series", &[]).await?;
        let mut entries = Vec::new();
        for series in series_list {
            if series.statistics.size_on_disk == 0 {
                continue;
            }
            let files: Vec<SonarrEpisodeFile> = self
                .get_json("/episodefile", &[("seriesId", series.id.to_string())])
                .await?;
            entries.push(MediaEntry {
                metadata: MediaMetadata {
                    id: series.id,
                    media_type: MediaType::Series,
                    title: series.title,
                    url: format!("{}/series/{}", self.base_url(), series.title_slug),
                    added: series.added,
                },
                files: files
                    .into_iter()
                    .map(|f| MediaFile {
                        id: f.id,
                        season: f.season_number,
                        original_file_path: base_name(&f.relative_path),
                        size: f.size.max(0) as u64,
                    })
                    .collect(),
            });
        }
        Ok(entries)
    }

    async fn delete_movie_files(
        &self,
        file_ids: &[i64],
        unmonitor: bool,
    ) -> Result<(), SourceError> {
        let movie_ids: BTreeSet<i64> = if unmonitor {
            let query: Vec<_> = file_ids
                .iter()
                .map(|id| ("movieFileIds", id.to_string()))
                .collect();
            let files: Vec<RadarrMovieFile> = self.get_json("/moviefile", &query).await?;
            files.into_iter().map(|f| f.movie_id).collect()
        } else {
            BTreeSet::new()
        };

        if self.dry_run {
            info!(?file_ids, ?movie_ids, "[DRY RUN] Skipping Radarr movie file deletion");
            return Ok(());
        }

        self.send(
            self.request(Method::DELETE, "/moviefile/bulk")
                .json(&json!({ "movieFileIds": file_ids })),
        )
        .await?;

        if !movie_ids.is_empty() {
            self.send(
                self.request(Method::PUT, "/movie/editor")
                    .json(&json!({ "movieIds": movie_ids, "monitored": false })),
            )
            .await?;
        }
        Ok(())
    }

    async fn delete_episode_files(
        &self,
        file_ids: &[i64],
        unmonitor: bool,
    ) -> Result<(), SourceError> {
        let mut seasons_by_series: BTreeMap<i64, BTreeSet<i32>> = BTreeMap::new();
        if unmonitor {
            let query: Vec<_> = file_ids
                .iter()
                .map(|id| ("episodeFileIds", id.to_string()))
                .collect();
            let files: Vec<SonarrEpisodeFile> = self.get_json("/episodefile", &query).await?;
            for file in files {
                seasons_by_series
                    .entry(file.series_id)
                    .or_default()
                    .insert(file.season_number);
            }
        }

        if self.dry_run {
            info!(?file_ids, "[DRY RUN] Skipping Sonarr episode file deletion");
            return Ok(());
        }

        self.send(
            self.request(Method::DELETE, "/episodefile/bulk")
                .json(&json!({ "episodeFileIds": file_ids })),
        )
        .await?;

        let mut errors = Vec::new();
        for (series_id, seasons) in seasons_by_series {
            if let Err(e) = self.unmonitor_seasons(series_id, &seasons).await {
                errors.push(SourceError::ApiError(format!(
                    "could not update monitoring status of series {}: {}",
                    series_id, e
                )));
            }
        }
        SourceError::join(errors)
    }

    /// Sonarr has no partial update, so the full series document is round-tripped.
    async fn unmonitor_seasons(
        &self,
        series_id: i64,
        seasons: &BTreeSet<i32>,
    ) -> Result<(), SourceError> {
        let endpoint = format!("/series/{}", series_id);
        let mut series: Value = self.get_json(&endpoint, &[]).await?;
        if let Some(list) = series.get_mut("seasons").and_then(Value::as_array_mut) {
            for season in list.iter_mut() {
                let Some(season) = season.as_object_mut() else {
                    continue;
                };
                let number = season.get("seasonNumber").and_then(Value::as_i64);
                if number.is_some_and(|n| seasons.contains(&(n as i32))) {
                    season.insert("monitored".to_string(), Value::Bool(false));
                }
            }
        }
        debug!("Unmonitoring seasons {:?} of series {}", seasons, series_id);
        self.send(self.request(Method::PUT, &endpoint).json(&series))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MediaSource for ArrSource {
    fn supported_media_type(&self) -> MediaType {
        self.kind.media_type()
    }

    async fn get_media(&self) -> Result<Vec<MediaEntry>, SourceError> {
        match self.kind {
            ArrKind::Radarr => self.get_movies().await,
            ArrKind::Sonarr => self.get_series().await,
        }
    }

    async fn delete_media_files(
        &self,
        file_ids: &[i64],
        stop_parent_monitoring: bool,
    ) -> Result<(), SourceError> {
        if file_ids.is_empty() {
            return Ok(());
        }
        match self.kind {
            ArrKind::Radarr => self.delete_movie_files(file_ids, stop_parent_monitoring).await,
            ArrKind::Sonarr => self.delete_episode_files(file_ids, stop_parent_monitoring).await,
        }
    }
}

/// Final path component, falling back to the input.
fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    id: i64,
    title: String,
    #[serde(default)]
    tmdb_id: i64,
    added: DateTime<Utc>,
    #[serde(default)]
    has_file: bool,
    #[serde(default)]
    size_on_disk: i64,
    #[serde(default)]
    movie_file: Option<RadarrMovieFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovieFile {
    id: i64,
    #[serde(default)]
    movie_id: i64,
    #[serde(default)]
    relative_path: String,
    #[serde(default)]
    original_file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    id: i64,
    title: String,
    #[serde(default)]
    title_slug: String,
    added: DateTime<Utc>,
    #[serde(default)]
    statistics: SonarrStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrStatistics {
    #[serde(default)]
    size_on_disk: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrEpisodeFile {
    id: i64,
    series_id: i64,
    season_number: i32,
    #[serde(default)]
    relative_path: String,
    #[serde(default)]
    size: i64,
}
