//! Inventory engine: links media with torrents, evaluates retention and
//! serves the cached result.

mod disk_cache;
mod linker;
mod media_id;
mod retention;
mod rows;
mod service;
mod types;

pub use disk_cache::{snapshot_file_name, DiskCache, CACHE_DIR_ENV};
pub use linker::{Linker, PathLinker};
pub use media_id::{FileSelector, MediaId};
pub use retention::{RetentionPolicy, TrackerRetentionPolicy};
pub use rows::{media_row, summary_row};
pub use service::{InventoryService, PAGE_SIZE};
pub use types::*;
