use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors raised at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required but not provided in environment variables")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Finnhub API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinnhubConfig {
    /// API token sent as the X-Finnhub-Token header
    #[serde(skip_serializing)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per quote request (first try included)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff delay in milliseconds, doubled after every failed attempt
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Tracking and caching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// TTL of cached stock summaries in seconds
    #[serde(default = "default_summary_ttl_secs")]
    pub summary_ttl_secs: u64,

    /// Interval assigned to newly tracked symbols
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: i64,

    /// Price history retention (0 = keep forever)
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// PostgreSQL URL; the in-memory store is used when absent
    #[serde(skip_serializing)]
    pub database_url: Option<String>,

    #[serde(default = "default_pool_size")]
    pub db_pool_max_size: u32,

    /// Redis URL; the in-memory cache is used when absent
    #[serde(skip_serializing)]
    pub redis_url: Option<String>,

    pub finnhub: FinnhubConfig,

    pub tracking: TrackingConfig,
}

impl FinnhubConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            summary_ttl_secs: default_summary_ttl_secs(),
            check_interval_ms: default_check_interval_ms(),
            retention_days: default_retention_days(),
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables
    ///
    /// Call `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("FINNHUB_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing("FINNHUB_API_KEY"))?;

        let finnhub = FinnhubConfig {
            api_key,
            base_url: std::env::var("FINNHUB_BASE_URL").unwrap_or_else(|_| default_base_url()),
            timeout_ms: env_or("FINNHUB_TIMEOUT", default_timeout_ms())?,
            retry_attempts: env_or("FINNHUB_RETRY_ATTEMPTS", default_retry_attempts())?,
            retry_delay_ms: env_or("FINNHUB_RETRY_DELAY", default_retry_delay_ms())?,
        };

        let tracking = TrackingConfig {
            summary_ttl_secs: env_or("CACHE_TTL", default_summary_ttl_secs())?,
            check_interval_ms: env_or("TRACKING_INTERVAL_MS", default_check_interval_ms())?,
            retention_days: env_or("PRICE_RETENTION_DAYS", default_retention_days())?,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
            port: env_or("PORT", default_port())?,
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            db_pool_max_size: env_or("DB_POOL_MAX_SIZE", default_pool_size())?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            finnhub,
            tracking,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    "https://finnhub.io/api/v1".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_summary_ttl_secs() -> u64 {
    30
}

fn default_check_interval_ms() -> i64 {
    60_000
}

fn default_retention_days() -> i64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}
