//! Application assembly.

use crate::{seed, telemetry};
use axum::Router;
use cachet_cache::{BackingStore, CacheEngine, MemoryStore, RedisStore, WarmUpCoordinator};
use cachet_config::{AppConfig, RedisConfig};
use cachet_core::CachetResult;
use cachet_rest::{create_router, AppState};
use std::sync::Arc;
use tracing::{info, warn};

/// Picks the backing store: Redis when enabled, otherwise the in-process
/// store.
pub fn create_store(config: &RedisConfig) -> CachetResult<Arc<dyn BackingStore>> {
    if config.enabled {
        Ok(Arc::new(RedisStore::from_config(config)?))
    } else {
        warn!("Redis disabled, using the in-process store; entries are lost on restart");
        Ok(Arc::new(MemoryStore::new()))
    }
}

/// The assembled server components.
pub struct App {
    pub engine: Arc<CacheEngine>,
    pub warmup: Arc<WarmUpCoordinator>,
    pub router: Router,
}

impl App {
    /// Builds the application from configuration.
    pub fn build(config: &AppConfig) -> CachetResult<Self> {
        Ok(Self::with_store(config, create_store(&config.redis)?))
    }

    /// Builds the application over an existing store.
    pub fn with_store(config: &AppConfig, store: Arc<dyn BackingStore>) -> Self {
        let engine = Arc::new(CacheEngine::new(store, &config.cache));

        let warmup = seed::build_routines(&config.warmup)
            .into_iter()
            .fold(WarmUpCoordinator::new(engine.clone()), WarmUpCoordinator::with_routine);
        let warmup = Arc::new(warmup);
        info!(routines = ?warmup.routine_names(), "Warm-up routines registered");

        let state = AppState::new(engine.clone(), warmup.clone());
        let mut router = create_router(state, &config.server);
        if config.observability.metrics_enabled {
            router = router.merge(telemetry::metrics_router(&config.observability.metrics_path));
        }

        Self {
            engine,
            warmup,
            router,
        }
    }

    /// Runs warm-up in the background when enabled.
    pub fn spawn_warm_up(&self, config: &AppConfig) {
        if !config.warmup.enabled {
            info!("Cache warm-up disabled");
            return;
        }

        let warmup = self.warmup.clone();
        tokio::spawn(async move {
            warmup.warm_up().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use cachet_cache::SetOptions;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.redis.enabled = false;
        config
    }

    #[test]
    fn test_disabled_redis_uses_memory_store() {
        assert!(create_store(&local_config().redis).is_ok());
    }

    #[test]
    fn test_bad_redis_url_fails() {
        let config = RedisConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(create_store(&config).is_err());
    }

    #[tokio::test]
    async fn test_router_is_wired_to_engine() {
        let app = App::build(&local_config()).unwrap();
        app.engine.set("a", &1u32, SetOptions::new()).await;

        let response = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cache/keys/a/exists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_seed_files_are_warmed() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("device_categories.json"),
            r#"{"device:categories:all": ["wheelchair", "hoist"]}"#,
        )
        .unwrap();

        let mut config = local_config();
        config.warmup.seed_dir = dir.path().to_string_lossy().into_owned();

        let app = App::build(&config).unwrap();
        assert_eq!(
            app.warmup.routine_names(),
            vec!["device_categories", "notification_templates", "pricing_rules"]
        );

        let report = app.warmup.warm_up().await;
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(
            app.engine.get::<Vec<String>>("device:categories:all").await,
            Some(vec!["wheelchair".to_string(), "hoist".to_string()])
        );
    }
}
