//! API module
//!
//! Contains HTTP request handlers and the router that wires them together.

pub mod extract;
pub mod receipts;

use crate::config::Config;
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Human-readable message
    pub message: String,
}

/// Build the application router
///
/// # Arguments
/// * `state` - Shared application state
/// * `config` - Configuration; only the upload limit is read here
pub fn create_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route(
            "/api/receipts",
            get(receipts::list_receipts).post(receipts::create_receipt),
        )
        .route("/api/receipts/upload", post(receipts::upload_receipt))
        .route(
            "/api/receipts/:id",
            get(receipts::get_receipt)
                .put(receipts::update_receipt)
                .delete(receipts::delete_receipt),
        )
        .route("/api/receipts/:id/image", get(receipts::get_receipt_image))
        .layer(DefaultBodyLimit::max(config.upload.max_bytes))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// GET /api/health - Liveness check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Receiptly backend is healthy".to_string(),
    })
}
