use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server settings read once at startup. Collaborator-specific settings
/// (inference, frames, storage) are read by their own constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let http_timeout_secs = match lookup("MATKON_HTTP_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "MATKON_HTTP_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            database_url,
            bind_addr,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}
