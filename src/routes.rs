//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod exoplanet;
mod neo;
mod sbdb;

use crate::middleware::cors;
use crate::state::SharedState;
use axum::{middleware::from_fn, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState) -> Router {
    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(from_fn(cors))
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Proxies
        .route("/api/exo", get(exoplanet::exoplanets))
        .route("/api/neo", get(neo::neo))
        .route("/api/sbdb", get(sbdb::small_body))
        .route("/api/sbdb/resolve", get(sbdb::resolve))
        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
