// Webserver bind configuration

use serde::Deserialize;

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    /// Host/IP to bind: 127.0.0.1 = localhost only, 0.0.0.0 = all interfaces
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Bind address in `host:port` form
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
