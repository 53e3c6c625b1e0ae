pub mod clock;
pub mod config;
pub mod inventory;
pub mod media;
pub mod source;
pub mod testing;
pub mod torrent;
pub mod tracker;

pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use inventory::{InventoryError, InventoryPage, InventoryService, MediaRow, SortInfo};
pub use source::{CachedManager, SourceError};
