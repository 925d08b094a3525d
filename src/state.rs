//! Application state management
//!
//! Read-only configuration and the upstream client, shared by all handlers.
//! Nothing here changes after startup.

use crate::config::UpstreamConfig;
use crate::upstream::UpstreamFetch;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Upstream endpoints and the NASA API key
    pub config: UpstreamConfig,

    /// HTTP client used for every upstream call
    pub upstream: Arc<dyn UpstreamFetch>,
}

impl AppState {
    pub fn new(config: UpstreamConfig, upstream: Arc<dyn UpstreamFetch>) -> Self {
        Self { config, upstream }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
