//! Environment-driven configuration.
//!
//! Variables may come from the process environment or a `.env` file
//! (loaded with `dotenvy`). Unset variables fall back to [`crate::defaults`];
//! set-but-unparseable variables are configuration errors naming the variable.

use std::str::FromStr;

use tracing::debug;

use crate::defaults;
use crate::error::{Error, Result};

/// Server listen host.
pub const ENV_HOST: &str = "SEALMAIL_HOST";
/// Server listen port / client target port.
pub const ENV_PORT: &str = "SEALMAIL_PORT";
/// Mail store backend: `memory` or `postgres`.
pub const ENV_STORE: &str = "SEALMAIL_STORE";
/// PostgreSQL connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// PostgreSQL pool size.
pub const ENV_MAX_CONNECTIONS: &str = "SEALMAIL_MAX_CONNECTIONS";
/// Maximum DATA body length in lines.
pub const ENV_MAX_BODY_LINES: &str = "SEALMAIL_MAX_BODY_LINES";
/// Maximum DATA body length in bytes.
pub const ENV_MAX_BODY_BYTES: &str = "SEALMAIL_MAX_BODY_BYTES";

/// Where the server keeps delivered mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store, lost on restart.
    Memory,
    /// PostgreSQL via sqlx.
    Postgres { database_url: String },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub max_connections: u32,
    pub max_body_lines: usize,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            store: StoreBackend::Memory,
            max_connections: defaults::DB_MAX_CONNECTIONS,
            max_body_lines: defaults::MAX_BODY_LINES,
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment (after an optional `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();

        let store = match lookup(ENV_STORE).as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => {
                let database_url = lookup(ENV_DATABASE_URL).ok_or_else(|| {
                    Error::Config(format!(
                        "{} is required when {}=postgres",
                        ENV_DATABASE_URL, ENV_STORE
                    ))
                })?;
                StoreBackend::Postgres { database_url }
            }
            Some(other) => {
                return Err(Error::Config(format!(
                    "{} must be 'memory' or 'postgres', got '{}'",
                    ENV_STORE, other
                )))
            }
        };

        let config = Self {
            host: lookup(ENV_HOST).unwrap_or(base.host),
            port: parse_var(&lookup, ENV_PORT)?.unwrap_or(base.port),
            store,
            max_connections: parse_var(&lookup, ENV_MAX_CONNECTIONS)?
                .unwrap_or(base.max_connections),
            max_body_lines: parse_var(&lookup, ENV_MAX_BODY_LINES)?
                .unwrap_or(base.max_body_lines),
            max_body_bytes: parse_var(&lookup, ENV_MAX_BODY_BYTES)?
                .unwrap_or(base.max_body_bytes),
        };

        for (name, value) in [
            (ENV_MAX_BODY_LINES, config.max_body_lines),
            (ENV_MAX_BODY_BYTES, config.max_body_bytes),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        debug!(
            subsystem = "config",
            host = %config.host,
            port = config.port,
            max_body_lines = config.max_body_lines,
            max_body_bytes = config.max_body_bytes,
            "Server configuration loaded"
        );
        Ok(config)
    }

    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: defaults::CLIENT_HOST.to_string(),
            port: defaults::SERVER_PORT,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment (after an optional `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();
        Ok(Self {
            host: lookup(ENV_HOST).unwrap_or(base.host),
            port: parse_var(&lookup, ENV_PORT)?.unwrap_or(base.port),
        })
    }

    /// Socket address string to connect to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}
