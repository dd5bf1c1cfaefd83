//! Runtime configuration, read from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | `sqlite://estoque.db?mode=rwc` |
//! | `MAX_UPLOAD_BYTES` | 16 MiB |
//! | `LOG_FORMAT` | `json` (or `pretty`) |

use std::net::SocketAddr;

use estoque_observability::LogFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {message}")]
    Invalid {
        var: &'static str,
        value: String,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Upper bound on request bodies (applies to spreadsheet uploads).
    pub max_upload_bytes: usize,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: "sqlite://estoque.db?mode=rwc".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", raw)?;
        }
        if let Some(raw) = lookup("DATABASE_URL") {
            config.database_url = raw;
        }
        if let Some(raw) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", raw)?;
        }
        if let Some(raw) = lookup("LOG_FORMAT") {
            config.log_format = parse("LOG_FORMAT", raw)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        message: e.to_string(),
        value,
    })
}
