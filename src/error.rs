//! Error handling module
//!
//! Only errors the proxy synthesizes itself live here. Upstream HTTP errors
//! are relayed as-is and never become a `ProxyError`.

use crate::upstream::UpstreamError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Request-level error type
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Missing 'spk' or 'des' or 'sstr' query param")]
    MissingIdentifier,

    #[error("Proxy failed: {0}")]
    Transport(#[from] UpstreamError),

    #[error("SBDB: all attempts failed")]
    ResolutionExhausted { attempts: Vec<String> },

    /// Caller-supplied path that would not stay under the configured upstream base
    #[error("Invalid 'path' query param")]
    InvalidUpstreamUrl(String),
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            ProxyError::MissingIdentifier => (StatusCode::BAD_REQUEST, self.to_string(), None),
            ProxyError::Transport(e) => {
                error!("Proxy error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Proxy failed".to_string(),
                    Some(e.to_string()),
                )
            }
            ProxyError::ResolutionExhausted { attempts } => {
                warn!("SBDB resolution exhausted after [{}]", attempts.join(", "));
                (
                    StatusCode::NOT_FOUND,
                    self.to_string(),
                    Some(format!("tried {}", attempts.join(", "))),
                )
            }
            ProxyError::InvalidUpstreamUrl(msg) => {
                warn!("Rejected upstream path: {}", msg);
                (StatusCode::BAD_REQUEST, self.to_string(), Some(msg.clone()))
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for proxy handlers
pub type ProxyResult<T> = Result<T, ProxyError>;
