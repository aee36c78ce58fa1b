//! Server Configuration Module
//!
//! Bind address resolution for the HTTP server. Loaded from environment
//! variables with defaults for local development.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub host: String,
    /// Raw port value, validated in [`ServerConfig::bind_addr`]
    pub port: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TIERBENCH_API_BIND`: interface to bind (default: 0.0.0.0)
    /// - `PORT`, then `TIERBENCH_API_PORT`: listen port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("TIERBENCH_API_BIND").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("TIERBENCH_API_PORT").ok())
                .unwrap_or(defaults.port),
        }
    }

    /// Parse host and port into a socket address.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self
            .port
            .parse::<u16>()
            .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", self.port)))?;

        let addr = format!("{}:{}", self.host, port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}
