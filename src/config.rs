//! Configuration Module
//!
//! Engine options for the request cache plus the admin server settings,
//! loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// == Defaults ==
const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_MAX_SIZE: usize = 100;
const DEFAULT_REFRESH_THRESHOLD: f64 = 0.8;
const DEFAULT_PERSISTENCE_KEY: &str = "app_request_cache";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_IGNORED_PARAMS: [&str; 3] = ["timestamp", "_t", "nocache"];

/// Options recognized by the cache engine at construction.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a write does not carry its own
    pub default_ttl: Duration,
    /// Maximum number of entries kept in the store
    pub max_size: usize,
    /// Allow refreshes that serve cached data while fetching
    pub enable_background_refresh: bool,
    /// Fraction of the TTL after which a hit triggers a background refresh
    pub background_refresh_threshold: f64,
    /// Save the store to the persistence backend on every mutation
    pub enable_persistence: bool,
    /// Name of the durable slot the snapshot is written to
    pub persistence_key: String,
    /// Log every hit, miss and stale serve
    pub debug_mode: bool,
    /// Interval between two expiry sweeps
    pub sweep_interval: Duration,
    /// Query parameters stripped from keys before lookup
    pub ignored_query_params: Vec<String>,
}

impl CacheConfig {
    /// Creates a CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_SIZE` - Maximum entries (default: 100)
    /// - `CACHE_BACKGROUND_REFRESH` - Enable background refresh (default: true)
    /// - `CACHE_REFRESH_THRESHOLD` - Refresh threshold fraction (default: 0.8)
    /// - `CACHE_PERSISTENCE` - Enable persistence (default: true)
    /// - `CACHE_PERSISTENCE_KEY` - Persistence slot name (default: app_request_cache)
    /// - `CACHE_DEBUG` - Per-request debug logging (default: false)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Expiry sweep interval (default: 300)
    /// - `CACHE_IGNORED_PARAMS` - Comma separated query params to strip
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_parse::<u64>("CACHE_DEFAULT_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            max_size: env_parse("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            enable_background_refresh: env_parse("CACHE_BACKGROUND_REFRESH")
                .unwrap_or(defaults.enable_background_refresh),
            background_refresh_threshold: env_parse("CACHE_REFRESH_THRESHOLD")
                .unwrap_or(defaults.background_refresh_threshold),
            enable_persistence: env_parse("CACHE_PERSISTENCE")
                .unwrap_or(defaults.enable_persistence),
            persistence_key: env::var("CACHE_PERSISTENCE_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.persistence_key),
            debug_mode: env_parse("CACHE_DEBUG").unwrap_or(defaults.debug_mode),
            sweep_interval: env_parse::<u64>("CACHE_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            ignored_query_params: env::var("CACHE_IGNORED_PARAMS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.ignored_query_params),
        }
    }

    /// Checks the options for values the engine cannot work with.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.max_size == 0 {
            return Some("max_size must be at least 1".to_string());
        }
        if self.default_ttl.is_zero() {
            return Some("default_ttl must be greater than zero".to_string());
        }
        let threshold = self.background_refresh_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Some(format!(
                "background_refresh_threshold must be in (0, 1), got {}",
                threshold
            ));
        }
        if self.sweep_interval.is_zero() {
            return Some("sweep_interval must be greater than zero".to_string());
        }
        if self.enable_persistence && self.persistence_key.is_empty() {
            return Some("persistence_key cannot be empty".to_string());
        }
        None
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_millis(DEFAULT_TTL_MS),
            max_size: DEFAULT_MAX_SIZE,
            enable_background_refresh: true,
            background_refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
            enable_persistence: true,
            persistence_key: DEFAULT_PERSISTENCE_KEY.to_string(),
            debug_mode: false,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            ignored_query_params: DEFAULT_IGNORED_PARAMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Admin server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine options
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding the persisted snapshot files
    pub persistence_dir: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_PERSISTENCE_DIR` - Snapshot directory (default: .cache)
    /// - every variable read by [`CacheConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            persistence_dir: env::var("CACHE_PERSISTENCE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".cache")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            persistence_dir: PathBuf::from(".cache"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
