//! Health and configuration endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};
use seedwarden_core::SanitizedConfig;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub dry_run: bool,
    pub inventory: InventoryHealth,
}

/// Whether the inventory cache holds a snapshot, and how many titles it has.
#[derive(Serialize)]
pub struct InventoryHealth {
    pub cached: bool,
    pub titles: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.inventory().snapshot().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        dry_run: state.dry_run(),
        inventory: InventoryHealth {
            cached: snapshot.is_some(),
            titles: snapshot.map_or(0, |media| media.len()),
        },
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}
