//! Small-body identity resolution
//!
//! Tries SBDB lookups one identifier at a time, in the fixed order
//! spk → designation → free-text search, and returns the first reply that is
//! a 2xx, parses as JSON, and is not an upstream "not found" message.
//! Attempts are strictly sequential; nothing from a failed attempt is kept.

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::sbdb::{self, SbdbLookupKey};
use crate::upstream::{UpstreamError, UpstreamFetch, UpstreamResponse};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

static NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not found").expect("static regex"));

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,6})\b").expect("static regex"));

/// Single-identifier SBDB lookup
#[async_trait]
pub trait SbdbLookup: Send + Sync {
    async fn lookup(&self, key: &SbdbLookupKey) -> Result<UpstreamResponse, UpstreamError>;
}

/// Lookup that goes straight to the configured SBDB endpoint
pub struct UpstreamLookup<'a> {
    pub upstream: &'a dyn UpstreamFetch,
    pub config: &'a UpstreamConfig,
}

#[async_trait]
impl<'a> SbdbLookup for UpstreamLookup<'a> {
    async fn lookup(&self, key: &SbdbLookupKey) -> Result<UpstreamResponse, UpstreamError> {
        sbdb::lookup(self.upstream, self.config, key).await
    }
}

/// Why an attempt was not accepted
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Transport(String),
    Status(u16),
    NotJson,
    Empty,
    NotFound(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Transport(e) => write!(f, "transport error: {}", e),
            Rejection::Status(code) => write!(f, "status {}", code),
            Rejection::NotJson => write!(f, "body is not JSON"),
            Rejection::Empty => write!(f, "empty document"),
            Rejection::NotFound(msg) => write!(f, "not found: {}", msg),
        }
    }
}

/// Judge one SBDB reply
pub fn evaluate(reply: &UpstreamResponse) -> Result<Value, Rejection> {
    if !reply.status.is_success() {
        return Err(Rejection::Status(reply.status.as_u16()));
    }

    let data: Value = serde_json::from_slice(&reply.body).map_err(|_| Rejection::NotJson)?;

    match &data {
        Value::Null | Value::Bool(false) => return Err(Rejection::Empty),
        Value::String(s) if s.is_empty() => return Err(Rejection::Empty),
        _ => {}
    }

    if let Some(message) = data.get("message").and_then(Value::as_str) {
        if NOT_FOUND.is_match(message) {
            return Err(Rejection::NotFound(message.to_string()));
        }
    }

    Ok(data)
}

/// Numeric designation at the start of an object name, e.g. `"433 Eros"` → `"433"`
pub fn extract_numeric_designation(name: &str) -> Option<String> {
    LEADING_NUMBER
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Ordered candidate list. Without a designation, one is inferred from `name`.
pub fn candidates(spk: Option<&str>, designation: Option<&str>, name: Option<&str>) -> Vec<SbdbLookupKey> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    let spk = present(spk);
    let name = present(name);
    let designation = present(designation)
        .map(str::to_string)
        .or_else(|| name.and_then(extract_numeric_designation));

    let mut keys = Vec::with_capacity(3);
    if let Some(spk) = spk {
        keys.push(SbdbLookupKey::Spk(spk.to_string()));
    }
    if let Some(des) = designation {
        keys.push(SbdbLookupKey::Designation(des));
    }
    if let Some(name) = name {
        keys.push(SbdbLookupKey::SearchString(name.to_string()));
    }
    keys
}

/// Run `candidates` through `lookup` in order, stopping at the first accepted reply
pub async fn resolve(lookup: &dyn SbdbLookup, candidates: &[SbdbLookupKey]) -> ProxyResult<Value> {
    if candidates.is_empty() {
        return Err(ProxyError::MissingIdentifier);
    }

    for key in candidates {
        let verdict = match lookup.lookup(key).await {
            Ok(reply) => evaluate(&reply),
            Err(e) => Err(Rejection::Transport(e.to_string())),
        };

        match verdict {
            Ok(data) => {
                info!("SBDB resolved via {}", key);
                return Ok(data);
            }
            Err(reason) => debug!("SBDB attempt {} rejected: {}", key, reason),
        }
    }

    Err(ProxyError::ResolutionExhausted {
        attempts: candidates.iter().map(|k| k.param_name().to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Replies chosen per identifier kind; records every key asked for
    struct ScriptedLookup {
        spk: Result<UpstreamResponse, UpstreamError>,
        des: Result<UpstreamResponse, UpstreamError>,
        sstr: Result<UpstreamResponse, UpstreamError>,
        calls: AtomicU64,
        seen: Mutex<Vec<SbdbLookupKey>>,
    }

    impl ScriptedLookup {
        fn new() -> Self {
            let unused = || Err(UpstreamError("not scripted".into()));
            Self {
                spk: unused(),
                des: unused(),
                sstr: unused(),
                calls: AtomicU64::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SbdbLookup for ScriptedLookup {
        async fn lookup(&self, key: &SbdbLookupKey) -> Result<UpstreamResponse, UpstreamError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.seen.lock().unwrap().push(key.clone());
            match key {
                SbdbLookupKey::Spk(_) => self.spk.clone(),
                SbdbLookupKey::Designation(_) => self.des.clone(),
                SbdbLookupKey::SearchString(_) => self.sstr.clone(),
            }
        }
    }

    fn ok_json(body: &str) -> Result<UpstreamResponse, UpstreamError> {
        Ok(UpstreamResponse::new(StatusCode::OK, Some("application/json"), body.to_string()))
    }

    #[test]
    fn test_extract_numeric_designation() {
        assert_eq!(extract_numeric_designation("433 Eros"), Some("433".to_string()));
        assert_eq!(extract_numeric_designation("  99942 Apophis"), Some("99942".to_string()));
        assert_eq!(extract_numeric_designation("(2019 AB)"), None);
        assert_eq!(extract_numeric_designation("1234567"), None);
        assert_eq!(extract_numeric_designation("433Eros"), None);
    }

    #[test]
    fn test_candidates_order_and_inference() {
        assert_eq!(
            candidates(Some("2000433"), None, Some("433 Eros")),
            vec![
                SbdbLookupKey::Spk("2000433".into()),
                SbdbLookupKey::Designation("433".into()),
                SbdbLookupKey::SearchString("433 Eros".into()),
            ]
        );

        assert_eq!(
            candidates(None, Some("2010 PK9"), Some("433 Eros")),
            vec![
                SbdbLookupKey::Designation("2010 PK9".into()),
                SbdbLookupKey::SearchString("433 Eros".into()),
            ]
        );

        assert!(candidates(Some(""), Some("  "), None).is_empty());
    }

    #[test]
    fn test_evaluate_rejections() {
        let reply = |status, body: &str| UpstreamResponse::new(status, None, body.to_string());

        assert_eq!(evaluate(&reply(StatusCode::NOT_FOUND, "{}")), Err(Rejection::Status(404)));
        assert_eq!(evaluate(&reply(StatusCode::OK, "<html/>")), Err(Rejection::NotJson));
        assert_eq!(evaluate(&reply(StatusCode::OK, "null")), Err(Rejection::Empty));
        assert_eq!(
            evaluate(&reply(StatusCode::OK, r#"{"message":"specified object was NOT FOUND"}"#)),
            Err(Rejection::NotFound("specified object was NOT FOUND".into()))
        );
        assert_eq!(
            evaluate(&reply(StatusCode::OK, r#"{"object":{"des":"433"}}"#)),
            Ok(json!({"object": {"des": "433"}}))
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let mut lookup = ScriptedLookup::new();
        lookup.spk = Ok(UpstreamResponse::new(StatusCode::BAD_REQUEST, Some("application/json"), "{}"));
        lookup.des = ok_json(r#"{"object":{"fullname":"433 Eros (A898 PA)"}}"#);
        lookup.sstr = ok_json(r#"{"object":{"fullname":"wrong"}}"#);

        let keys = candidates(Some("2000433"), Some("433"), Some("Eros"));
        let data = resolve(&lookup, &keys).await.unwrap();

        assert_eq!(data["object"]["fullname"], "433 Eros (A898 PA)");
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 2);
        assert_eq!(
            *lookup.seen.lock().unwrap(),
            vec![
                SbdbLookupKey::Spk("2000433".into()),
                SbdbLookupKey::Designation("433".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_message_is_a_failure() {
        let mut lookup = ScriptedLookup::new();
        lookup.sstr = ok_json(r#"{"message":"specified object was not found","code":"200"}"#);

        let keys = candidates(None, None, Some("nonexistent object"));
        let err = resolve(&lookup, &keys).await.unwrap_err();

        assert!(matches!(err, ProxyError::ResolutionExhausted { ref attempts } if attempts == &["sstr"]));
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_moves_to_next_candidate() {
        let mut lookup = ScriptedLookup::new();
        lookup.spk = Err(UpstreamError("connection reset".into()));
        lookup.sstr = ok_json(r#"{"object":{"spkid":"3542519"}}"#);

        let keys = candidates(Some("3542519"), None, Some("(2010 PK9)"));
        let data = resolve(&lookup, &keys).await.unwrap();

        assert_eq!(data["object"]["spkid"], "3542519");
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_all_failures_are_aggregated() {
        let mut lookup = ScriptedLookup::new();
        lookup.spk = ok_json("not json");
        lookup.des = Ok(UpstreamResponse::new(StatusCode::INTERNAL_SERVER_ERROR, None, ""));
        lookup.sstr = ok_json(r#"{"message":"Not Found"}"#);

        let keys = candidates(Some("1"), Some("2"), Some("three"));
        let err = resolve(&lookup, &keys).await.unwrap_err();

        match err {
            ProxyError::ResolutionExhausted { attempts } => {
                assert_eq!(attempts, vec!["spk", "des", "sstr"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_no_candidates_is_missing_identifier() {
        let lookup = ScriptedLookup::new();
        let err = resolve(&lookup, &[]).await.unwrap_err();

        assert!(matches!(err, ProxyError::MissingIdentifier));
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_upstream_lookup_goes_through_sbdb_endpoint() {
        use crate::upstream::fake::{param, FakeUpstream};

        let upstream = FakeUpstream::new()
            .reply_json(StatusCode::OK, r#"{"message":"specified object was not found"}"#)
            .reply_json(StatusCode::OK, r#"{"object":{"des":"433"}}"#)
            .reply_json(StatusCode::OK, r#"{"object":{"des":"never"}}"#);
        let config = UpstreamConfig::default();
        let lookup = UpstreamLookup {
            upstream: &upstream,
            config: &config,
        };

        let keys = candidates(Some("2000433"), Some("433"), Some("Eros"));
        let data = resolve(&lookup, &keys).await.unwrap();

        assert_eq!(data["object"]["des"], "433");
        assert_eq!(upstream.call_count(), 2);
        let urls = upstream.urls();
        assert_eq!(param(&urls[0], "spk").as_deref(), Some("2000433"));
        assert_eq!(param(&urls[1], "des").as_deref(), Some("433"));
        assert_eq!(param(&urls[1], "spk"), None);
    }
}
