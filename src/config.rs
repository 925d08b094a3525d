//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.
//! Settings are read once at startup and never mutated afterwards.

use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Public, rate-limited key accepted by api.nasa.gov
pub const DEMO_API_KEY: &str = "DEMO_KEY";

const DEFAULT_NEO_BASE_URL: &str = "https://api.nasa.gov/neo/rest/v1";
const DEFAULT_SBDB_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb.api";
const DEFAULT_EXOPLANET_TAP_URL: &str = "https://exoplanetarchive.ipac.caltech.edu/TAP/sync";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// Upstream services and credentials
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Key injected into every NeoWS call. Never taken from the caller.
    pub nasa_api_key: String,
    pub neo_base_url: Url,
    pub sbdb_url: Url,
    pub exoplanet_tap_url: Url,
    /// `None` disables the per-request timeout
    pub timeout: Option<Duration>,
    /// Largest upstream body relayed; longer replies fail as transport errors
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            nasa_api_key: DEMO_API_KEY.to_string(),
            neo_base_url: Url::parse(DEFAULT_NEO_BASE_URL).expect("valid default url"),
            sbdb_url: Url::parse(DEFAULT_SBDB_URL).expect("valid default url"),
            exoplanet_tap_url: Url::parse(DEFAULT_EXOPLANET_TAP_URL).expect("valid default url"),
            timeout: Some(Duration::from_secs(30)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

// Hand-written so the API key never ends up in logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("nasa_api_key", &"<redacted>")
            .field("neo_base_url", &self.neo_base_url.as_str())
            .field("sbdb_url", &self.sbdb_url.as_str())
            .field("exoplanet_tap_url", &self.exoplanet_tap_url.as_str())
            .field("timeout", &self.timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl UpstreamConfig {
    pub fn uses_demo_key(&self) -> bool {
        self.nasa_api_key == DEMO_API_KEY
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            host: var("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let nasa_api_key = var("NASA_API_KEY").unwrap_or_else(|| DEMO_API_KEY.to_string());

        let timeout = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "UPSTREAM_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => UpstreamConfig::default().timeout,
        };

        let max_body_bytes = match var("UPSTREAM_MAX_BODY_BYTES") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidValue(format!(
                        "UPSTREAM_MAX_BODY_BYTES must be a positive byte count, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let upstream = UpstreamConfig {
            nasa_api_key,
            neo_base_url: parse_url("NASA_NEO_BASE_URL", var("NASA_NEO_BASE_URL"), DEFAULT_NEO_BASE_URL)?,
            sbdb_url: parse_url("JPL_SBDB_URL", var("JPL_SBDB_URL"), DEFAULT_SBDB_URL)?,
            exoplanet_tap_url: parse_url(
                "EXOPLANET_TAP_URL",
                var("EXOPLANET_TAP_URL"),
                DEFAULT_EXOPLANET_TAP_URL,
            )?,
            timeout,
            max_body_bytes,
        };

        Ok(Self { server, upstream })
    }
}

fn parse_url(name: &str, value: Option<String>, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    let parsed = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidValue(format!("{} is not a valid URL: {}", name, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidValue(format!(
            "{} must use http or https, got '{}'",
            name, other
        ))),
    }
}
