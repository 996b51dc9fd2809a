use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

// API Routes - what the query client calls
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            .route("/generate", post(handlers::api::generate))
            .route("/execute", post(handlers::api::execute))
            .route("/query", post(handlers::api::query))
            .route("/schema", get(handlers::api::schema)),
    )
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api_routes())
        .route("/health", get(handlers::api::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
