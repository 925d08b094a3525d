//! JPL Small-Body Database proxy

use super::{QueryParams, Relayed};
use crate::config::UpstreamConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::upstream::{UpstreamError, UpstreamFetch, UpstreamResponse};
use std::fmt;
use tracing::debug;
use url::Url;

pub const CACHE_CONTROL: &str = "s-maxage=300";

/// One way of naming a small body, in lookup preference order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SbdbLookupKey {
    Spk(String),
    Designation(String),
    SearchString(String),
}

impl SbdbLookupKey {
    /// Query parameter the SBDB API expects for this key
    pub fn param_name(&self) -> &'static str {
        match self {
            SbdbLookupKey::Spk(_) => "spk",
            SbdbLookupKey::Designation(_) => "des",
            SbdbLookupKey::SearchString(_) => "sstr",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            SbdbLookupKey::Spk(v) | SbdbLookupKey::Designation(v) | SbdbLookupKey::SearchString(v) => v,
        }
    }
}

impl fmt::Display for SbdbLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.param_name(), self.value())
    }
}

/// Identifiers supplied to a single SBDB call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SbdbQuery {
    pub spk: Option<String>,
    pub designation: Option<String>,
    pub search_string: Option<String>,
}

impl SbdbQuery {
    pub fn from_query(params: &QueryParams) -> Self {
        let owned = |key: &str| params.get(key).map(str::to_string);
        Self {
            spk: owned("spk"),
            designation: owned("des"),
            search_string: owned("sstr"),
        }
    }

    /// Supplied identifiers in spk, des, sstr order
    pub fn keys(&self) -> Vec<SbdbLookupKey> {
        let mut keys = Vec::with_capacity(3);
        if let Some(spk) = &self.spk {
            keys.push(SbdbLookupKey::Spk(spk.clone()));
        }
        if let Some(des) = &self.designation {
            keys.push(SbdbLookupKey::Designation(des.clone()));
        }
        if let Some(sstr) = &self.search_string {
            keys.push(SbdbLookupKey::SearchString(sstr.clone()));
        }
        keys
    }
}

/// SBDB query URL carrying `keys` plus `phys-par=true`
pub fn upstream_url(base: &Url, keys: &[SbdbLookupKey]) -> Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for key in keys {
            pairs.append_pair(key.param_name(), key.value());
        }
        pairs.append_pair("phys-par", "true");
    }
    url
}

/// Issue one SBDB call for a single identifier
pub async fn lookup(
    upstream: &dyn UpstreamFetch,
    config: &UpstreamConfig,
    key: &SbdbLookupKey,
) -> Result<UpstreamResponse, UpstreamError> {
    let url = upstream_url(&config.sbdb_url, std::slice::from_ref(key));
    debug!("SBDB request: {}", url);
    upstream.get(&url).await
}

pub async fn handle(
    upstream: &dyn UpstreamFetch,
    config: &UpstreamConfig,
    query: &SbdbQuery,
) -> ProxyResult<Relayed> {
    let keys = query.keys();
    if keys.is_empty() {
        return Err(ProxyError::MissingIdentifier);
    }

    let url = upstream_url(&config.sbdb_url, &keys);
    debug!("SBDB request: {}", url);

    let reply = upstream.get(&url).await?;

    debug!("SBDB replied {}", reply.status);
    Ok(Relayed::negotiated(reply, CACHE_CONTROL))
}
