use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seedwarden_core::{
    config::{Config, TorrentClientBackend},
    inventory::{DiskCache, PathLinker, TrackerRetentionPolicy},
    load_config,
    media::{ArrKind, ArrSource, DefaultMediaManager, MediaSource},
    torrent::{DefaultTorrentManager, DelugeSource, QBittorrentSource, TorrentSource},
    tracker::PatternTrackerResolver,
    validate_config, InventoryService, SystemClock,
};

use seedwarden_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging(log_format_from_env());

    // Determine config path
    let config_path = std::env::var("SEEDWARDEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "seedwarden {} starting (config {})",
        VERSION,
        &config_hash[..16]
    );
    if config.dry_run {
        warn!("Dry run enabled: no files or torrents will be deleted");
    }

    let inventory = Arc::new(build_inventory(&config)?);

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), inventory));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Log output format, chosen with `SEEDWARDEN_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn log_format_from_env() -> LogFormat {
    match std::env::var("SEEDWARDEN_LOG_FORMAT") {
        Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

/// Wire adapters, managers and policies into the inventory service.
fn build_inventory(config: &Config) -> Result<InventoryService> {
    let mut media_sources: Vec<Arc<dyn MediaSource>> = Vec::new();
    if let Some(sonarr) = &config.media.sonarr {
        info!("Initializing Sonarr source at {}", sonarr.url);
        media_sources.push(Arc::new(
            ArrSource::new(ArrKind::Sonarr, sonarr.clone(), config.dry_run)
                .context("Failed to create Sonarr source")?,
        ));
    }
    if let Some(radarr) = &config.media.radarr {
        info!("Initializing Radarr source at {}", radarr.url);
        media_sources.push(Arc::new(
            ArrSource::new(ArrKind::Radarr, radarr.clone(), config.dry_run)
                .context("Failed to create Radarr source")?,
        ));
    }

    let mut torrent_sources: Vec<Arc<dyn TorrentSource>> = Vec::new();
    for client in &config.torrent_clients {
        match client.backend {
            TorrentClientBackend::QBittorrent => {
                info!(
                    "Initializing qBittorrent client {:?} at {}",
                    client.name, client.url
                );
                torrent_sources.push(Arc::new(
                    QBittorrentSource::new(client.clone(), config.dry_run).with_context(|| {
                        format!("Failed to create torrent client {:?}", client.name)
                    })?,
                ));
            }
            TorrentClientBackend::Deluge => {
                info!(
                    "Initializing Deluge client {:?} at {}",
                    client.name, client.url
                );
                torrent_sources.push(Arc::new(
                    DelugeSource::new(client.clone(), config.dry_run).with_context(|| {
                        format!("Failed to create torrent client {:?}", client.name)
                    })?,
                ));
            }
        }
    }
    if torrent_sources.is_empty() {
        warn!("No torrent clients configured, every file will be reported as unlinked");
    }

    let resolver = PatternTrackerResolver::new(&config.trackers)
        .context("Failed to build tracker resolver")?;
    info!("Loaded {} tracker rules", resolver.len());

    let clock = Arc::new(SystemClock);
    let disk_cache = DiskCache::from_config(&config.inventory);
    info!("Inventory snapshots in {:?}", disk_cache.dir());

    Ok(InventoryService::new(
        &config.inventory,
        Arc::new(DefaultMediaManager::new(media_sources)),
        Arc::new(DefaultTorrentManager::new(torrent_sources)),
        Arc::new(PathLinker::new()),
        Arc::new(TrackerRetentionPolicy::new(Arc::new(resolver), clock.clone())),
        clock,
    )
    .with_disk_cache(disk_cache))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
