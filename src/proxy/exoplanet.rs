//! NASA Exoplanet Archive proxy
//!
//! Builds an ADQL query over the `pscomppars` table from three bounded
//! filters and submits it to the archive's synchronous TAP endpoint.

use super::{QueryParams, Relayed};
use crate::config::UpstreamConfig;
use crate::error::ProxyResult;
use crate::upstream::UpstreamFetch;
use tracing::debug;
use url::Url;

pub const CACHE_CONTROL: &str = "s-maxage=300, stale-while-revalidate=600";

pub const DEFAULT_MAX_DISTANCE_PC: f64 = 20.0;
pub const DEFAULT_MIN_PLANETS: f64 = 1.0;
pub const DEFAULT_ROW_LIMIT: f64 = 200.0;

const MAX_DISTANCE_RANGE: (f64, f64) = (1.0, 5000.0);
const MIN_PLANETS_RANGE: (f64, f64) = (1.0, 50.0);
const ROW_LIMIT_RANGE: (f64, f64) = (1.0, 500.0);

/// Exoplanet filters, always within range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExoplanetQueryParams {
    pub max_distance_parsecs: f64,
    pub min_planet_count: u32,
    pub row_limit: u32,
}

impl Default for ExoplanetQueryParams {
    fn default() -> Self {
        Self::clamped(DEFAULT_MAX_DISTANCE_PC, DEFAULT_MIN_PLANETS, DEFAULT_ROW_LIMIT)
    }
}

impl ExoplanetQueryParams {
    /// Clamp raw numbers into range. Non-finite inputs take the default.
    pub fn clamped(max_distance: f64, min_planets: f64, limit: f64) -> Self {
        let max_distance = clamp_or_default(max_distance, DEFAULT_MAX_DISTANCE_PC, MAX_DISTANCE_RANGE);
        let min_planets = clamp_or_default(min_planets, DEFAULT_MIN_PLANETS, MIN_PLANETS_RANGE);
        let limit = clamp_or_default(limit, DEFAULT_ROW_LIMIT, ROW_LIMIT_RANGE);

        Self {
            max_distance_parsecs: max_distance,
            // `sy_pnum >= 2.5` selects the same rows as `sy_pnum >= 3`
            min_planet_count: min_planets.ceil() as u32,
            row_limit: limit.floor() as u32,
        }
    }

    /// Read `max_pc`, `min_p` and `limit` from the query string.
    ///
    /// Missing or non-numeric values fall back to their defaults.
    pub fn from_query(params: &QueryParams) -> Self {
        let number = |key: &str, default: f64| {
            params
                .get(key)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .unwrap_or(default)
        };

        Self::clamped(
            number("max_pc", DEFAULT_MAX_DISTANCE_PC),
            number("min_p", DEFAULT_MIN_PLANETS),
            number("limit", DEFAULT_ROW_LIMIT),
        )
    }

    pub fn to_adql(&self) -> String {
        let query = format!(
            r#"
            SELECT TOP {limit}
                pl_name, hostname, sy_pnum, sy_snum, sy_dist, disc_year, disc_method
            FROM pscomppars
            WHERE sy_dist IS NOT NULL
                AND sy_dist <= {max_pc}
                AND sy_pnum >= {min_p}
            ORDER BY sy_dist ASC, hostname ASC
            "#,
            limit = self.row_limit,
            max_pc = self.max_distance_parsecs,
            min_p = self.min_planet_count,
        );

        collapse_whitespace(&query)
    }
}

fn clamp_or_default(value: f64, default: f64, (lo, hi): (f64, f64)) -> f64 {
    let value = if value.is_finite() { value } else { default };
    value.clamp(lo, hi)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the single-line ADQL query for the given filters
pub fn build_query(max_distance: f64, min_planets: f64, limit: f64) -> String {
    ExoplanetQueryParams::clamped(max_distance, min_planets, limit).to_adql()
}

/// TAP synchronous query URL for `adql`, asking for JSON output
pub fn tap_url(base: &Url, adql: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("request", "doQuery")
        .append_pair("lang", "adql")
        .append_pair("format", "json")
        .append_pair("query", adql);
    url
}

pub async fn handle(
    upstream: &dyn UpstreamFetch,
    config: &UpstreamConfig,
    params: ExoplanetQueryParams,
) -> ProxyResult<Relayed> {
    let adql = build_query(
        params.max_distance_parsecs,
        f64::from(params.min_planet_count),
        f64::from(params.row_limit),
    );
    debug!("Exoplanet ADQL: {}", adql);

    let url = tap_url(&config.exoplanet_tap_url, &adql);
    let reply = upstream.get(&url).await?;

    debug!("Exoplanet archive replied {}", reply.status);
    Ok(Relayed::negotiated(reply, CACHE_CONTROL))
}
