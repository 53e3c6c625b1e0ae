//! Inventory API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seedwarden_core::inventory::{SortKey, SortOrder};
use seedwarden_core::{InventoryError, InventoryPage, MediaRow, SortInfo};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing media
#[derive(Debug, Deserialize)]
pub struct ListMediaParams {
    /// 1-based page number
    pub page: Option<usize>,
    pub sort_key: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct MediaErrorResponse {
    pub error: String,
}

/// Inventory error mapped to a status code.
pub struct ApiError(InventoryError);

impl From<InventoryError> for ApiError {
    fn from(e: InventoryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InventoryError::MalformedId(_) => StatusCode::BAD_REQUEST,
            InventoryError::MediaNotFound(_) => StatusCode::NOT_FOUND,
            other => {
                error!("Inventory request failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(MediaErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List one page of titles
pub async fn list_media(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListMediaParams>,
) -> Result<Json<InventoryPage>, ApiError> {
    let sort = SortInfo::new(
        params.sort_key.unwrap_or_default(),
        params.sort_order.unwrap_or_default(),
    );
    let page = state
        .inventory()
        .get_media_inventory(params.page.unwrap_or(1), sort)
        .await?;
    Ok(Json(page))
}

/// Get the full row tree of a title
pub async fn get_media_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MediaRow>, ApiError> {
    Ok(Json(state.inventory().get_expanded_media_row(&id).await?))
}

/// Delete a title, season or file along with its torrents
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.inventory().delete_media(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rebuild the inventory from the backends
pub async fn refresh_media(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.inventory().refresh_cache().await?;
    Ok(StatusCode::NO_CONTENT)
}
