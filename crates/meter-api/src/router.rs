//! Route definitions for the audience meter HTTP server.
//!
//! Explicit routes cover the socket, the full stats dump, and health. Every
//! other path lands in the fallback, which serves `/<namespace>.json` point
//! queries and the demo page.

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/stats.json", get(handlers::stats::stats_json))
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
        .fallback(handlers::fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
