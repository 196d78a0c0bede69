//! Configuration loader with layered sources.

use crate::validation::{format_validation_errors, ConfigValidator};
use crate::AppConfig;
use cachet_core::CachetError;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Environment variable prefix for overrides, e.g. `CACHET__REDIS__URL`.
pub const ENV_PREFIX: &str = "CACHET";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `CACHET__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, CachetError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, CachetError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration stays in place when the new one is invalid.
    pub async fn reload(&self) -> Result<(), CachetError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<AppConfig, CachetError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var("CACHET_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        info!("Loading configuration for environment: {}", environment);

        let app_config = Self::load_layers(config_dir, &environment)?;

        if let Err(errors) = ConfigValidator::validate(&app_config) {
            return Err(CachetError::Configuration(format_validation_errors(&errors)));
        }

        if !app_config.redis.enabled {
            warn!("Redis is disabled; using the in-process store (entries are not shared between instances)");
        }

        Ok(app_config)
    }

    /// Builds the layered configuration without validating it.
    fn load_layers(config_dir: &str, environment: &str) -> Result<AppConfig, CachetError> {
        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut app_config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error_to_cachet_error)?;

        app_config.app.environment = environment.to_string();

        Ok(app_config)
    }
}

fn config_error_to_cachet_error(err: ConfigError) -> CachetError {
    CachetError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    fn dir_str(dir: &TempDir) -> String {
        dir.path().to_string_lossy().to_string()
    }

    #[test]
    fn test_missing_directory_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(&dir_str(&dir), "test").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.namespace, "cachet");
        assert_eq!(config.app.environment, "test");
    }

    #[test]
    fn test_environment_file_overrides_default() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            r#"
            [cache]
            namespace = "booking"
            default_ttl_secs = 120

            [redis]
            pool_size = 4
            "#,
        );
        write(
            &dir,
            "staging.toml",
            r#"
            [cache]
            default_ttl_secs = 60
            "#,
        );

        let config = ConfigLoader::load_layers(&dir_str(&dir), "staging").unwrap();
        assert_eq!(config.cache.namespace, "booking");
        assert_eq!(config.cache.default_ttl_secs, 60);
        assert_eq!(config.redis.pool_size, 4);
    }

    #[test]
    fn test_local_file_wins() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[server]\nport = 9000\n");
        write(&dir, "local.toml", "[server]\nport = 9100\n");

        let config = ConfigLoader::load_layers(&dir_str(&dir), "development").unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_warmup_routines_from_file() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            r#"
            [warmup]
            seed_dir = "/srv/seed"

            [[warmup.routines]]
            name = "plans"
            file = "plans.json"
            tags = ["pricing:rules"]
            "#,
        );

        let config = ConfigLoader::load_layers(&dir_str(&dir), "development").unwrap();
        assert_eq!(config.warmup.seed_dir, "/srv/seed");
        assert_eq!(config.warmup.routines.len(), 1);
        assert_eq!(config.warmup.routines[0].ttl_secs, None);
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[server\nport = ");

        let result = ConfigLoader::load_layers(&dir_str(&dir), "development");
        assert!(matches!(result, Err(CachetError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[redis]\nurl = \"\"\n");

        let result = ConfigLoader::new(dir_str(&dir));
        match result {
            Err(CachetError::Configuration(message)) => assert!(message.contains("redis")),
            other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "local.toml", "[cache]\nnamespace = \"first\"\n");

        let loader = ConfigLoader::new(dir_str(&dir)).unwrap();
        assert_eq!(loader.get().await.cache.namespace, "first");

        write(&dir, "local.toml", "[cache]\nnamespace = \"second\"\n");
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.cache.namespace, "second");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_config() {
        let dir = TempDir::new().unwrap();
        write(&dir, "local.toml", "[cache]\nnamespace = \"stable\"\n");
        let loader = ConfigLoader::new(dir_str(&dir)).unwrap();

        write(&dir, "local.toml", "[cache]\nnamespace = \"\"\n");
        assert!(loader.reload().await.is_err());
        assert_eq!(loader.get().await.cache.namespace, "stable");
    }
}
