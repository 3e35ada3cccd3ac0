use std::net::SocketAddr;

use crate::domain::errors::ConfigError;

/// Runtime configuration of the tradebook service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize, // Request body limit on the HTTP adapter
    pub log_filter: String,    // Used when RUST_LOG is unset
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: 64 * 1024,
            log_filter: "tradebook=info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_env() -> ServiceConfig {
        let _ = dotenvy::dotenv();
        let mut config = ServiceConfig::default();

        if let Ok(addr) = std::env::var("TRADEBOOK_BIND_ADDR") {
            match parse_bind_addr(&addr) {
                Ok(value) => config.bind_addr = value,
                Err(e) => {
                    tracing::warn!("{}, using default: {}", e, config.bind_addr);
                }
            }
        }

        if let Ok(limit) = std::env::var("TRADEBOOK_MAX_BODY_BYTES") {
            match limit.parse::<usize>() {
                Ok(value) if value > 0 => config.max_body_bytes = value,
                Ok(value) => {
                    tracing::warn!(
                        "Invalid TRADEBOOK_MAX_BODY_BYTES value: {} (must be positive), using default: {}",
                        value,
                        config.max_body_bytes
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse TRADEBOOK_MAX_BODY_BYTES '{}': {}, using default: {}",
                        limit,
                        e,
                        config.max_body_bytes
                    );
                }
            }
        }

        if let Ok(filter) = std::env::var("TRADEBOOK_LOG_FILTER") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        Ok(())
    }
}

fn parse_bind_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidBindAddress(addr.to_string()))
}
