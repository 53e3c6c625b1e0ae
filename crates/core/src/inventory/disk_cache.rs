//! On-disk manager snapshots.
//!
//! Each manager gets one file in the cache directory, named by the hex
//! SHA-1 of its identity. The contents are whatever the manager's
//! `save_cache` produced.

use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::info;

use crate::config::InventoryConfig;
use crate::source::CachedManager;

use super::InventoryError;

/// Environment variable overriding the configured cache directory.
pub const CACHE_DIR_ENV: &str = "SEEDWARDEN_CACHE_DIR";

/// Directory of manager snapshots.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory from `SEEDWARDEN_CACHE_DIR` if set, else from config.
    pub fn from_config(config: &InventoryConfig) -> Self {
        match std::env::var(CACHE_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(config.cache_dir.clone()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for<M: CachedManager + ?Sized>(&self, manager: &M) -> PathBuf {
        self.dir.join(snapshot_file_name(manager.identity()))
    }

    /// Restore a manager from its snapshot.
    pub async fn load<M: CachedManager + ?Sized>(&self, manager: &M) -> Result<(), InventoryError> {
        let path = self.path_for(manager);
        info!(
            "Loading {} from cache file {}",
            manager.identity(),
            path.display()
        );
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| InventoryError::CacheFile {
                path: path.clone(),
                source,
            })?;
        manager
            .load_cache(&data)
            .await
            .map_err(|source| InventoryError::Source {
                stage: format!("load {} snapshot", manager.identity()),
                source,
            })
    }

    /// Write a manager's current state to its snapshot.
    pub async fn save<M: CachedManager + ?Sized>(&self, manager: &M) -> Result<(), InventoryError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| InventoryError::CacheFile {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(manager);
        info!(
            "Saving {} to cache file {}",
            manager.identity(),
            path.display()
        );
        let data = manager
            .save_cache()
            .await
            .map_err(|source| InventoryError::Source {
                stage: format!("save {} snapshot", manager.identity()),
                source,
            })?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| InventoryError::CacheFile { path, source })
    }
}

/// Hex-encoded SHA-1 of a manager identity.
pub fn snapshot_file_name(identity: &str) -> String {
    format!("{:x}", Sha1::digest(identity.as_bytes()))
}
