//! Axum router setup for the Crucible server

use std::path::Path;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::{
    ServerState,
    handlers::{catalog, get_element, health_check, list_elements},
    websocket::ws_handler,
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        // Search-visualization sessions
        .route("/ws", get(ws_handler))
        // Encyclopedia
        .route("/api/elements", get(list_elements))
        .route("/api/elements/:name", get(get_element))
        .route("/api/catalog", get(catalog))
        .route("/api/health", get(health_check));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(CorsLayer::permissive()).with_state(state)
}
