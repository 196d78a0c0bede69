//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Admin HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Redis (backing store) configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Cache engine configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Startup warm-up configuration.
    #[serde(default)]
    pub warmup: WarmUpConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "cachet".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Admin HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_enabled: false,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the admin server bind address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Redis configuration.
///
/// Timeouts are short and there is no offline queue: when the
/// store is degraded, calls fail after `max_retries` instead of piling up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Use Redis. When disabled an in-process store is used instead.
    pub enabled: bool,
    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-command timeout in milliseconds.
    pub command_timeout_ms: u64,
    /// Retries per command after the first attempt.
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            enabled: true,
            connect_timeout_ms: 2000,
            command_timeout_ms: 2000,
            max_retries: 3,
            retry_delay_ms: 50,
        }
    }
}

impl RedisConfig {
    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the command timeout as a Duration.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Returns the retry base delay as a Duration.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Cache engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Service namespace prefixed to every key.
    pub namespace: String,
    /// TTL applied when a write supplies none, in seconds.
    pub default_ttl_secs: u64,
    /// Payloads larger than this are gzip-compressed when compression is requested.
    pub compression_threshold_bytes: usize,
    /// `COUNT` hint used when scanning for wildcard patterns.
    pub scan_batch_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "cachet".to_string(),
            default_ttl_secs: 300, // 5 minutes
            compression_threshold_bytes: 1024,
            scan_batch_size: 100,
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Startup warm-up configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmUpConfig {
    /// Run warm-up routines at startup.
    pub enabled: bool,
    /// Directory holding the JSON seed files.
    pub seed_dir: String,
    /// Routines to run.
    pub routines: Vec<WarmUpRoutineConfig>,
}

impl Default for WarmUpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed_dir: "./seed".to_string(),
            routines: vec![
                WarmUpRoutineConfig::new("device_categories", "device_categories.json", &["device:categories"], 3600),
                WarmUpRoutineConfig::new("notification_templates", "notification_templates.json", &["notification:templates"], 3600),
                WarmUpRoutineConfig::new("pricing_rules", "pricing_rules.json", &["pricing:rules"], 900),
            ],
        }
    }
}

/// A single warm-up routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmUpRoutineConfig {
    /// Routine name, used in logs and reports.
    pub name: String,
    /// Seed file name relative to `seed_dir`.
    pub file: String,
    /// Tags attached to every entry written by this routine.
    #[serde(default)]
    pub tags: Vec<String>,
    /// TTL for the entries, in seconds. Falls back to the cache default.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl WarmUpRoutineConfig {
    /// Creates a routine definition.
    #[must_use]
    pub fn new(name: &str, file: &str, tags: &[&str], ttl_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            ttl_secs: Some(ttl_secs),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,
    /// Metrics endpoint path.
    pub metrics_path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
        }
    }
}
