use std::path::PathBuf;
use std::time::Duration;

use common::engine::EngineConfig;
use common::reconciler::{BackoffConfig, ReconcilerConfig};

use crate::state::AppConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // relation engine configuration
    pub engine: EngineConfig,
    pub reconciler: ReconcilerConfig,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Resolve the runtime configuration from the on-disk config
    pub fn from_app_config(app: &AppConfig) -> Result<Self, ConfigError> {
        let log_level = app
            .log_level
            .parse()
            .map_err(|_| ConfigError::LogLevel(app.log_level.clone()))?;

        Ok(Self {
            api_port: app.api_port,
            engine: EngineConfig {
                request_timeout: Duration::from_secs(app.request_timeout_secs.max(1)),
                ..EngineConfig::default()
            },
            reconciler: ReconcilerConfig {
                resync_interval: Duration::from_secs(app.resync_secs.max(1)),
                workers: app.reconcile_workers.max(1),
                backoff: BackoffConfig::default(),
            },
            log_level,
            log_dir: None,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: AppConfig::default().api_port,
            engine: EngineConfig::default(),
            reconciler: ReconcilerConfig::default(),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid log level: {0}")]
    LogLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config() {
        let app = AppConfig {
            log_level: "debug".into(),
            request_timeout_secs: 3,
            resync_secs: 0,
            ..AppConfig::default()
        };
        let config = Config::from_app_config(&app).unwrap();
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.engine.request_timeout, Duration::from_secs(3));
        assert_eq!(config.reconciler.resync_interval, Duration::from_secs(1));

        let app = AppConfig {
            log_level: "chatty".into(),
            ..AppConfig::default()
        };
        assert!(Config::from_app_config(&app).is_err());
    }
}
