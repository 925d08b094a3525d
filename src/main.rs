//! Astro Proxy - NASA/JPL data relay
//!
//! A thin server-side proxy in front of three public astronomy services:
//! - NASA Exoplanet Archive (ADQL over TAP): `/api/exo`
//! - NASA NeoWS near-Earth object feed: `/api/neo`
//! - JPL Small-Body Database: `/api/sbdb` and `/api/sbdb/resolve`
//!
//! Every request is handled independently: one upstream call, one response,
//! no shared mutable state.

mod config;
mod error;
mod middleware;
mod proxy;
mod resolver;
mod routes;
mod state;
mod upstream;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use crate::upstream::HttpUpstream;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Astro Proxy...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded: {:?}", settings.upstream);
    if settings.upstream.uses_demo_key() {
        warn!("⚠️  NASA_API_KEY not set, NeoWS calls use the rate-limited DEMO_KEY");
    }

    let upstream = HttpUpstream::new(settings.upstream.timeout, settings.upstream.max_body_bytes)?;
    let state = Arc::new(AppState::new(settings.upstream.clone(), Arc::new(upstream)));

    // Build the router
    let app = create_router(state);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   GET  /health                   - Liveness check");
    info!("   GET  /api/exo                  - Exoplanet systems (max_pc, min_p, limit)");
    info!("   GET  /api/neo                  - NeoWS relay (path, ...), target=jpl for SBDB");
    info!("   GET  /api/sbdb                 - SBDB lookup (spk, des, sstr)");
    info!("   GET  /api/sbdb/resolve         - SBDB lookup with spk → des → name fallback");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,astro_proxy=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
