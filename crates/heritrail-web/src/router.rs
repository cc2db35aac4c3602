//! Axum router: maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    bibliography::resolve,
    gallery::upload,
    images::image_proxy,
    reviews::delete_review,
    system::health,
};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/health", get(health))

        // API endpoints
        .route("/api/bibliography/resolve", post(resolve))
        .route("/api/image-proxy",          get(image_proxy))
        .route("/api/reviews/delete",       post(delete_review))
        .route(
            "/api/gallery/upload",
            post(upload)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
