use crate::server::{handlers, types::AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the service router.
///
/// `max_upload_bytes` caps request bodies; `None` lifts axum's default limit
/// entirely.
pub fn create_router(state: AppState, max_upload_bytes: Option<usize>) -> Router {
    let state = Arc::new(state);

    let body_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/predict", post(handlers::predict))
        .route("/metrics", get(handlers::render_metrics))
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        // Open policy: mirrors origin, method and headers, allows credentials.
        .layer(CorsLayer::very_permissive())
}
