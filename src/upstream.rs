//! Upstream HTTP access
//!
//! Every proxy handler issues exactly one GET through [`UpstreamFetch`].
//! The production implementation wraps a shared `reqwest::Client`; tests
//! swap in a scripted fake.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Transport-level failure: DNS, connect, TLS, timeout, or a broken body stream
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct UpstreamError(pub String);

/// Raw upstream reply, kept byte-for-byte for pass-through
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// `Content-Type` as declared by the upstream, if any
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait UpstreamFetch: Send + Sync {
    async fn get(&self, url: &Url) -> Result<UpstreamResponse, UpstreamError>;
}

/// reqwest-backed upstream client
pub struct HttpUpstream {
    http_client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpUpstream {
    pub fn new(timeout: Option<Duration>, max_body_bytes: usize) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("astro-proxy/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| UpstreamError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl UpstreamFetch for HttpUpstream {
    #[instrument(name = "upstream_get", skip_all, fields(host = url.host_str().unwrap_or("")))]
    async fn get(&self, url: &Url) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| UpstreamError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = read_capped(response, self.max_body_bytes).await?;

        debug!("Upstream replied {} ({} bytes)", status, body.len());

        Ok(UpstreamResponse::new(status, content_type.as_deref(), body))
    }
}

/// Read the whole body, failing once it grows past `limit` bytes
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Bytes, UpstreamError> {
    let too_large = || UpstreamError(format!("Upstream body exceeds {} bytes", limit));

    let declared = response.content_length();
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::with_capacity(declared.unwrap_or(0) as usize);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| UpstreamError(format!("Failed to read upstream body: {}", e)))?
    {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(body))
}

/// Copy of `url` with the value of `api_key` masked, for logging
pub fn redacted(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "api_key") {
        return url.to_string();
    }

    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_masks_api_key_only() {
        let url = Url::parse("https://api.nasa.gov/neo/rest/v1/feed?start_date=2024-01-01&api_key=secret")
            .unwrap();
        let shown = redacted(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("start_date=2024-01-01"));
        assert!(shown.contains("api_key=***") || shown.contains("api_key=%2A%2A%2A"));
    }

    #[test]
    fn test_redacted_leaves_other_urls_alone() {
        let url = Url::parse("https://ssd-api.jpl.nasa.gov/sbdb.api?des=433").unwrap();
        assert_eq!(redacted(&url), url.to_string());
    }

    #[test]
    fn test_http_upstream_builds_with_and_without_timeout() {
        assert!(HttpUpstream::new(Some(Duration::from_secs(1)), 1024).is_ok());
        assert!(HttpUpstream::new(None, 1024).is_ok());
    }

    fn canned(body: &str) -> reqwest::Response {
        reqwest::Response::from(axum::http::Response::new(body.to_string()))
    }

    #[tokio::test]
    async fn test_body_within_limit_is_read_whole() {
        let body = read_capped(canned(&"x".repeat(100)), 1000).await.unwrap();
        assert_eq!(body.len(), 100);

        let exact = read_capped(canned(&"x".repeat(100)), 100).await.unwrap();
        assert_eq!(&exact[..], "x".repeat(100).as_bytes());
    }

    #[tokio::test]
    async fn test_oversized_body_is_a_transport_error() {
        let err = read_capped(canned(&"x".repeat(100)), 10).await.unwrap_err();
        assert_eq!(err.0, "Upstream body exceeds 10 bytes");
    }
}
