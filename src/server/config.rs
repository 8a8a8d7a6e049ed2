use crate::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Maximum concurrent connections
    pub max_connections: usize,

    /// Maximum concurrent connections per client IP
    pub max_connections_per_ip: usize,

    /// Outgoing chunk size, announced to each peer after the handshake
    pub chunk_size: u32,

    /// Read deadline for the handshake and every chunk read
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 1935,
            max_connections: 1000,
            max_connections_per_ip: 10,
            chunk_size: 4096,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Create config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("Invalid port: 0"));
        }

        if self.max_connections == 0 {
            return Err(Error::config("Invalid max_connections: 0"));
        }

        if self.chunk_size < 128 {
            return Err(Error::config("Chunk size must be at least 128"));
        }

        if self.chunk_size > 65536 {
            return Err(Error::config("Chunk size must not exceed 65536"));
        }

        if self.idle_timeout.is_zero() {
            return Err(Error::config("Idle timeout must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for ServerConfig
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        ServerConfigBuilder {
            config: ServerConfig::default(),
        }
    }

    /// Set host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set max connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Set max connections per IP
    pub fn max_connections_per_ip(mut self, max: usize) -> Self {
        self.config.max_connections_per_ip = max;
        self
    }

    /// Set outgoing chunk size
    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set idle read timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
