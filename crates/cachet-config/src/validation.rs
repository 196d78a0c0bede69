//! Configuration validation module.
//!
//! Provides comprehensive validation for all configuration values,
//! failing fast on invalid configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size must be at least one connection.
    EmptyPool,
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Timeout value is longer than the allowed ceiling.
    TimeoutTooLong { name: String, value: u64, maximum: u64 },
    /// Cache namespace is empty or contains whitespace or glob characters.
    InvalidNamespace { value: String },
    /// Warm-up routine is missing a name or seed file.
    InvalidWarmUpRoutine { index: usize, message: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::EmptyPool => write!(f, "Redis pool size must be at least 1"),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(
                    f,
                    "Pool size {} exceeds maximum allowed ({})",
                    value, maximum
                )
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::TimeoutTooLong { name, value, maximum } => {
                write!(
                    f,
                    "Timeout '{}' is {} (maximum {})",
                    name, value, maximum
                )
            }
            Self::InvalidNamespace { value } => {
                write!(
                    f,
                    "Invalid cache namespace: '{}' (must be non-empty without whitespace or any of *?[]\\)",
                    value
                )
            }
            Self::InvalidWarmUpRoutine { index, message } => {
                write!(f, "Invalid warm-up routine #{}: {}", index, message)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Creates a new validation result.
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Adds an error to the result.
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Store timeouts stay in the low seconds.
    const MAX_STORE_TIMEOUT_MS: u64 = 10_000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_server(&config.server, &mut result);
        Self::validate_redis(&config.redis, &mut result);
        Self::validate_cache(&config.cache, &mut result);
        Self::validate_warmup(&config.warmup, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    /// Validates server configuration.
    fn validate_server(config: &crate::ServerConfig, result: &mut ValidationResult) {
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.port,
            });
        }

        if config.request_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "server.request_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    /// Validates Redis configuration.
    fn validate_redis(config: &crate::RedisConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        if config.url.is_empty() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        } else if Url::parse(&config.url).is_err() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "Invalid URL format".to_string(),
            });
        }

        if config.pool_size == 0 {
            result.add_error(ConfigValidationError::EmptyPool);
        }
        if config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        for (name, value) in [
            ("redis.connect_timeout_ms", config.connect_timeout_ms),
            ("redis.command_timeout_ms", config.command_timeout_ms),
        ] {
            if value == 0 {
                result.add_error(ConfigValidationError::NonPositiveTimeout {
                    name: name.to_string(),
                    value,
                });
            } else if value > Self::MAX_STORE_TIMEOUT_MS {
                result.add_error(ConfigValidationError::TimeoutTooLong {
                    name: name.to_string(),
                    value,
                    maximum: Self::MAX_STORE_TIMEOUT_MS,
                });
            }
        }
    }

    /// Validates cache engine configuration.
    fn validate_cache(config: &crate::CacheConfig, result: &mut ValidationResult) {
        let invalid_char = |c: char| c.is_whitespace() || matches!(c, '*' | '?' | '[' | ']' | '\\');
        if config.namespace.is_empty() || config.namespace.chars().any(invalid_char) {
            result.add_error(ConfigValidationError::InvalidNamespace {
                value: config.namespace.clone(),
            });
        }

        if config.default_ttl_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "cache.default_ttl_secs".to_string(),
                value: 0,
            });
        }
    }

    /// Validates warm-up configuration.
    fn validate_warmup(config: &crate::WarmUpConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        for (index, routine) in config.routines.iter().enumerate() {
            if routine.name.trim().is_empty() {
                result.add_error(ConfigValidationError::InvalidWarmUpRoutine {
                    index,
                    message: "name cannot be empty".to_string(),
                });
            }
            if routine.file.trim().is_empty() {
                result.add_error(ConfigValidationError::InvalidWarmUpRoutine {
                    index,
                    message: "file cannot be empty".to_string(),
                });
            }
            if routine.ttl_secs == Some(0) {
                result.add_error(ConfigValidationError::NonPositiveTimeout {
                    name: format!("warmup.routines[{}].ttl_secs", index),
                    value: 0,
                });
            }
        }
    }

    /// Validates observability configuration.
    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        let format = config.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
