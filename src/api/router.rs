use super::handlers;
use crate::sink::MemorySink;
use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the Axum router with all view routes and shared state.
pub fn build(views: MemorySink) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/views", get(handlers::list_views))
        .route("/views/{key}", get(handlers::get_view))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(views)
}
