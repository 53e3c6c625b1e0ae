use std::sync::Arc;

use seedwarden_core::{Config, InventoryService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    inventory: Arc<InventoryService>,
}

impl AppState {
    pub fn new(config: Config, inventory: Arc<InventoryService>) -> Self {
        Self { config, inventory }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn dry_run(&self) -> bool {
        self.config.dry_run
    }

    pub fn inventory(&self) -> &InventoryService {
        self.inventory.as_ref()
    }
}
