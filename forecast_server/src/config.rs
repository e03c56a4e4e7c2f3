//! Server configuration

use std::net::SocketAddr;

/// Default request body limit: 16 MiB
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read `FORECAST_HOST`, `FORECAST_PORT` and `FORECAST_MAX_BODY_BYTES`,
    /// falling back to the defaults for unset or unparseable values
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("FORECAST_HOST").unwrap_or(defaults.host),
            port: lookup("FORECAST_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            max_body_bytes: lookup("FORECAST_MAX_BODY_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
