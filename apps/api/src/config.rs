//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults suitable for local development.

use std::env;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Prefix for the folios of generated global invoices
    pub folio_series: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(ApiConfig {
            port: env::var("VERDE_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VERDE_PORT".to_string()))?,

            database_path: env::var("VERDE_DATABASE_PATH")
                .unwrap_or_else(|_| "verde.db".to_string()),

            folio_series: env::var("VERDE_FOLIO_SERIES")
                .unwrap_or_else(|_| "GLOBAL".to_string()),
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Relies on the variables being unset in the test environment.
        let config = ApiConfig::load().unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.folio_series, "GLOBAL");
    }
}
