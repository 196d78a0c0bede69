//! Server startup output.

use cachet_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
                 __         __
  _________ ____/ /_  ___  / /_
 / ___/ __ `/ __/ __ \/ _ \/ __/
/ /__/ /_/ / /_/ / / /  __/ /_
\___/\__,_/\__/_/ /_/\___/\__/
    "#);
}

/// Lines describing where the server listens.
pub fn startup_lines(config: &AppConfig) -> Vec<String> {
    let base = format!("http://{}", config.server.addr());
    let mut lines = vec![
        format!("Admin API: {}/api/v1/cache", base),
        format!("Health:    {}/health", base),
        format!("Namespace: {}", config.cache.namespace),
    ];
    if config.observability.metrics_enabled {
        lines.push(format!("Metrics:   {}{}", base, config.observability.metrics_path));
    }
    lines
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    for line in startup_lines(config) {
        info!("{}", line);
    }
    info!("{}", separator);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_banner_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_banner();
    }

    #[test]
    fn test_startup_lines() {
        let mut config = AppConfig::default();
        config.server.port = 9400;
        config.observability.metrics_enabled = false;

        let lines = startup_lines(&config);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(":9400/api/v1/cache"));

        config.observability.metrics_enabled = true;
        let lines = startup_lines(&config);
        assert!(lines[3].ends_with(&config.observability.metrics_path));
    }
}
