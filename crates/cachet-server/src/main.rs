//! # Cachet Server
//!
//! Runs the cache engine against Redis (or the in-process store when Redis
//! is disabled), warms reference data at startup and serves the admin API.

use cachet_config::{AppConfig, ConfigLoader, ObservabilityConfig};
use cachet_core::{CachetError, CachetResult};
use cachet_server::{app::App, startup, telemetry};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.get().await,
        Err(e) => {
            telemetry::init_logging(&ObservabilityConfig::default());
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    telemetry::init_logging(&config.observability);
    startup::print_banner();
    info!("Starting Cachet server v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    if let Err(e) = run(config).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> CachetResult<()> {
    if config.observability.metrics_enabled {
        telemetry::init_metrics();
    }

    let app = App::build(&config)?;
    if !app.engine.ping().await {
        warn!("Backing store is not reachable at startup, serving misses until it answers");
    }
    app.spawn_warm_up(&config);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CachetError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    startup::print_startup_info(&config);

    let served = axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    app.engine.close().await;
    served.map_err(|e| CachetError::Internal(format!("HTTP server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
