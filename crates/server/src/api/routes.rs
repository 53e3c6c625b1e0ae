use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{media, system};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(system::health))
        .route("/config", get(system::get_config))
        // Inventory
        .route("/media", get(media::list_media))
        .route("/media/refresh", post(media::refresh_media))
        .route(
            "/media/{id}",
            get(media::get_media_row).delete(media::delete_media),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
