//! Application configuration
//!
//! Loaded once at startup from a TOML file (`--config <path>`, default
//! `apphub.toml`). Every field carries a default so a missing file or a
//! partial file still yields a runnable configuration. Schemas are split
//! per domain under `schemas/`.

pub mod schemas;

pub use schemas::monitor::MonitorConfig;
pub use schemas::ratelimit::RateLimitConfig;
pub use schemas::server::ServerConfig;
pub use schemas::websocket::WebsocketConfig;

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::logger::{self, LogTag};

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub websocket: WebsocketConfig,

    #[serde(default)]
    pub ratelimit: RateLimitConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error: defaults are returned and a notice
    /// is logged. Unknown keys are rejected so typos surface at startup
    /// instead of silently falling back to defaults.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            logger::info(
                LogTag::Config,
                &format!("{} not found, using built-in defaults", path.display()),
            );
            return Ok(Config::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        logger::info(
            LogTag::Config,
            &format!("Configuration loaded from {}", path.display()),
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_runnable() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.ratelimit.bucket_capacity >= 1.0);
        assert!(config.websocket.send_queue_capacity > 0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let raw = r#"
            [server]
            port = 9090

            [ratelimit]
            window_limit = 10
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.ratelimit.window_limit, 10);
        assert_eq!(config.websocket.keepalive_interval_secs, 30);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let raw = r#"
            [server]
            prot = 9090
        "#;
        assert!(toml::from_str::<Config>(raw).is_err());
    }
}
