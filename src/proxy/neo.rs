//! NASA NeoWS proxy
//!
//! Relays `/api/neo?path=<subpath>&...` to `{NASA_NEO_BASE_URL}/{subpath}`,
//! forwarding caller parameters and injecting the server-held API key.

use super::{QueryParams, Relayed};
use crate::config::UpstreamConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::upstream::{redacted, UpstreamFetch};
use tracing::debug;
use url::Url;

pub const CACHE_CONTROL: &str = "s-maxage=30";

pub const DEFAULT_SUBPATH: &str = "neo/browse";

/// Parameter carrying the NASA key upstream
pub const API_KEY_PARAM: &str = "api_key";

/// Keys that select what to proxy; never forwarded
pub const ROUTING_KEYS: [&str; 2] = ["path", "target"];

#[derive(Debug, Clone, PartialEq)]
pub struct NeoRequest {
    pub subpath: String,
    pub forwarded_params: Vec<(String, String)>,
}

impl NeoRequest {
    pub fn from_query(params: &QueryParams) -> Self {
        let subpath = params
            .get("path")
            .map(|p| p.trim_start_matches(is_separator))
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_SUBPATH)
            .to_string();

        let forwarded_params = params
            .iter()
            .filter(|(k, _)| !ROUTING_KEYS.contains(k) && *k != API_KEY_PARAM)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            subpath,
            forwarded_params,
        }
    }

    /// `{base}/{subpath}?{forwarded}&api_key={key}`
    ///
    /// Subpaths with `.` or `..` segments (plain or percent-encoded) are
    /// rejected, and the result must stay under `base`.
    pub fn upstream_url(&self, base: &Url, api_key: &str) -> ProxyResult<Url> {
        let subpath = self.subpath.trim_start_matches(is_separator);
        if has_dot_segment(subpath) {
            return Err(ProxyError::InvalidUpstreamUrl(format!(
                "{}: dot segments are not allowed",
                self.subpath
            )));
        }

        let base_path = base.path().trim_end_matches('/');
        let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), subpath);
        let mut url = Url::parse(&joined)
            .map_err(|e| ProxyError::InvalidUpstreamUrl(format!("{}: {}", self.subpath, e)))?;

        if url.origin() != base.origin() || !url.path().starts_with(&format!("{}/", base_path)) {
            return Err(ProxyError::InvalidUpstreamUrl(format!(
                "{}: resolves outside {}",
                self.subpath,
                base.path()
            )));
        }

        // A '?' or '#' smuggled into the subpath must not reach the upstream query
        url.set_query(None);
        url.set_fragment(None);

        url.query_pairs_mut()
            .extend_pairs(
                self.forwarded_params
                    .iter()
                    .filter(|(k, _)| k != API_KEY_PARAM),
            )
            .append_pair(API_KEY_PARAM, api_key);

        Ok(url)
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// True if any segment of the path part is `.` or `..`, including `%2e` forms
fn has_dot_segment(subpath: &str) -> bool {
    let path = subpath.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    path.split(is_separator).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

pub async fn handle(
    upstream: &dyn UpstreamFetch,
    config: &UpstreamConfig,
    request: &NeoRequest,
) -> ProxyResult<Relayed> {
    let url = request.upstream_url(&config.neo_base_url, &config.nasa_api_key)?;
    debug!("NeoWS request: {}", redacted(&url));

    let reply = upstream.get(&url).await?;

    debug!("NeoWS replied {}", reply.status);
    Ok(Relayed::json(reply, CACHE_CONTROL))
}
