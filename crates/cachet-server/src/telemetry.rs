//! Logging and Prometheus export.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use cachet_config::ObservabilityConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Builds the log filter. `RUST_LOG` wins over the configured level.
pub fn log_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level)))
}

/// Installs the global subscriber, pretty or JSON per `log_format`.
pub fn init_logging(config: &ObservabilityConfig) {
    let registry = tracing_subscriber::registry().with(log_filter(config));

    if config.log_format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

/// Installs the Prometheus recorder. Returns `false` if it was already
/// installed or could not be.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus recorder already installed");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set");
                return false;
            }
            cachet_cache::register_metrics();
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Renders all metrics in Prometheus text format, `None` before
/// [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}

/// Router serving the Prometheus scrape endpoint at `path`.
pub fn metrics_router(path: &str) -> Router {
    Router::new().route(path, get(metrics_handler))
}

async fn metrics_handler() -> impl IntoResponse {
    match render_metrics() {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_uses_configured_level() {
        std::env::remove_var("RUST_LOG");
        let config = ObservabilityConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        let filter = log_filter(&config).to_string();
        assert!(filter.contains("warn"));
        assert!(filter.contains("tower_http=info"));
    }
}
