//! Configuration management for the finance tracker backend.
//!
//! Configuration is set via environment variables:
//! - `JWT_SECRET` - Required. HS256 secret used to verify bearer tokens.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8080`.
//! - `STORE_BACKEND` - Optional. `sqlite` (default) or `memory`.
//! - `DATABASE_PATH` - Optional. SQLite file path. Defaults to `data/fintrack.db`.
//! - `STORE_TIMEOUT_MS` - Optional. Per-call store timeout. Defaults to `5000`.
//! - `CORS_ORIGIN` - Optional. Allowed origin for the dashboard. Defaults to
//!   allowing any origin.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Which storage backend to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Non-persistent, for tests and local development.
    Memory,
    /// SQLite database file.
    Sqlite(PathBuf),
}

/// Server configuration, built once at startup and injected via `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Secret used by the JWT verifier
    pub jwt_secret: String,

    /// Storage backend selection
    pub store: StoreBackend,

    /// Upper bound for a single store call
    pub store_timeout: Duration,

    /// Allowed CORS origin; `None` means any origin
    pub cors_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let store = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("sqlite") | Err(_) => {
                let path = std::env::var("DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/fintrack.db"));
                StoreBackend::Sqlite(path)
            }
            Ok(other) => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    other.to_string(),
                ))
            }
        };

        let timeout_ms: u64 = std::env::var("STORE_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("STORE_TIMEOUT_MS".to_string(), format!("{}", e))
            })?;

        let cors_origin = std::env::var("CORS_ORIGIN").ok();

        Ok(Self {
            host,
            port,
            jwt_secret,
            store,
            store_timeout: Duration::from_millis(timeout_ms),
            cors_origin,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(jwt_secret: String, store: StoreBackend) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret,
            store,
            store_timeout: Duration::from_millis(5000),
            cors_origin: None,
        }
    }
}
