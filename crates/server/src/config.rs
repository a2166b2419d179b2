//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FRESHLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `FRESHLINE_PORT` - Listen port (default: 3000)
//! - `FRESHLINE_STORAGE_BACKEND` - `memory` (default) or `postgres`
//! - `FRESHLINE_DATABASE_URL` - `PostgreSQL` connection string (required when
//!   the backend is `postgres`; falls back to `DATABASE_URL`)
//! - `FRESHLINE_SECURE_COOKIES` - Mark session cookies `Secure` (default: false)
//! - `FRESHLINE_REVENUE_INCLUDES_CANCELLED` - Count cancelled orders in
//!   dashboard revenue (default: true)
//! - `FRESHLINE_STRICT_STATUS_FLOW` - Enforce the forward-only order status
//!   flow on admin updates (default: false)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory store seeded with demo data. State is lost on restart.
    Memory,
    /// `PostgreSQL` via sqlx.
    Postgres,
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Selected storage backend
    pub storage_backend: StorageBackend,
    /// Database connection URL (contains password); present iff the backend
    /// is `postgres`
    pub database_url: Option<SecretString>,
    /// Mark session cookies `Secure` (requires HTTPS)
    pub secure_cookies: bool,
    /// Whether cancelled orders count toward dashboard revenue
    pub revenue_includes_cancelled: bool,
    /// Enforce forward-only order status transitions
    pub strict_status_flow: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is unparseable, or if the
    /// postgres backend is selected without a database URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("FRESHLINE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FRESHLINE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("FRESHLINE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("FRESHLINE_PORT".to_string(), e.to_string()))?;

        let storage_backend =
            parse_backend(&get_env_or_default("FRESHLINE_STORAGE_BACKEND", "memory"))?;

        let database_url = get_database_url("FRESHLINE_DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "FRESHLINE_DATABASE_URL".to_string(),
            ));
        }

        let secure_cookies = get_bool_or_default("FRESHLINE_SECURE_COOKIES", false)?;
        let revenue_includes_cancelled =
            get_bool_or_default("FRESHLINE_REVENUE_INCLUDES_CANCELLED", true)?;
        let strict_status_flow = get_bool_or_default("FRESHLINE_STRICT_STATUS_FLOW", false)?;

        Ok(Self {
            host,
            port,
            storage_backend,
            database_url,
            secure_cookies,
            revenue_includes_cancelled,
            strict_status_flow,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    if let Ok(value) = std::env::var(primary_key) {
        return Some(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Some(SecretString::from(value));
    }
    None
}

fn parse_backend(value: &str) -> Result<StorageBackend, ConfigError> {
    match value {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => Err(ConfigError::InvalidEnvVar(
            "FRESHLINE_STORAGE_BACKEND".to_string(),
            format!("expected 'memory' or 'postgres', got '{other}'"),
        )),
    }
}

fn get_bool_or_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => match value.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{other}'"),
            )),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("memory").unwrap(), StorageBackend::Memory);
        assert_eq!(parse_backend("postgres").unwrap(), StorageBackend::Postgres);
        assert!(parse_backend("sqlite").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            storage_backend: StorageBackend::Memory,
            database_url: None,
            secure_cookies: false,
            revenue_includes_cancelled: true,
            strict_status_flow: false,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
