use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Headroom for the two JSON fields and multipart framing
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    // Two media files plus the form's text fields
    let body_limit = state.max_file_bytes.saturating_mul(2) + FORM_OVERHEAD_BYTES;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording upload and analysis
        .route("/upload", post(handlers::upload))
        .layer(
            ServiceBuilder::new()
                // Add tracing middleware for request logging
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
