//! Route configuration and setup.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use vitrine_core::Config;

use crate::api_doc::get_openapi_spec;
use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let api_routes = Router::new()
        .route("/uploads/chunk", post(handlers::chunk_upload::upload_chunk))
        .route(
            "/gallery/finalize",
            post(handlers::gallery::finalize_gallery_image),
        );

    tracing::info!(
        max_concurrent_requests = config.max_concurrent_requests,
        max_body_bytes = config.max_chunk_bytes,
        "HTTP limits configured"
    );

    let app = Router::new()
        .nest(API_PREFIX, api_routes)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(get_openapi_spec()) }),
        )
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.max_chunk_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
