//! Upstream proxies
//!
//! Each proxy turns caller parameters into exactly one upstream GET and relays
//! the reply. Upstream status and body are never reinterpreted.

pub mod exoplanet;
pub mod neo;
pub mod sbdb;

use crate::upstream::UpstreamResponse;
use axum::{
    body::Bytes,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::IgnoredAny;

pub const APPLICATION_JSON: &str = "application/json";

/// Used when a non-JSON upstream body comes without a declared type
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Decoded query string, in arrival order
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    /// Last value supplied for `key`, with empty strings treated as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

/// Outcome of the JSON sniff on an upstream body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Other,
}

impl BodyFormat {
    pub fn detect(body: &[u8]) -> Self {
        match serde_json::from_slice::<IgnoredAny>(body) {
            Ok(_) => BodyFormat::Json,
            Err(_) => BodyFormat::Other,
        }
    }
}

/// JSON bodies are labelled `application/json`; anything else keeps the
/// upstream's declared type.
pub fn negotiate_content_type(body: &[u8], declared: Option<&str>) -> String {
    match BodyFormat::detect(body) {
        BodyFormat::Json => APPLICATION_JSON.to_string(),
        BodyFormat::Other => declared.unwrap_or(FALLBACK_CONTENT_TYPE).to_string(),
    }
}

/// An upstream reply ready to be sent back to the caller
#[derive(Debug, Clone)]
pub struct Relayed {
    pub status: StatusCode,
    pub content_type: String,
    pub cache_control: &'static str,
    pub body: Bytes,
}

impl Relayed {
    /// Relay with content negotiation
    pub fn negotiated(reply: UpstreamResponse, cache_control: &'static str) -> Self {
        let content_type = negotiate_content_type(&reply.body, reply.content_type.as_deref());
        Self {
            status: reply.status,
            content_type,
            cache_control,
            body: reply.body,
        }
    }

    /// Relay declared as JSON regardless of the body
    pub fn json(reply: UpstreamResponse, cache_control: &'static str) -> Self {
        Self {
            status: reply.status,
            content_type: APPLICATION_JSON.to_string(),
            cache_control,
            body: reply.body,
        }
    }
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let content_type = HeaderValue::from_str(&self.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

        (
            self.status,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, HeaderValue::from_static(self.cache_control)),
            ],
            self.body,
        )
            .into_response()
    }
}
