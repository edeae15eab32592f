//! Process configuration read from the environment.
//!
//! | Variable                | Default | Meaning                                 |
//! |-------------------------|---------|-----------------------------------------|
//! | `PORT`                  | `3000`  | TCP port to listen on (all interfaces)  |
//! | `USE_PERSISTENT_STORES` | `false` | Use Postgres instead of the memory store |
//! | `DATABASE_URL`          | none    | Postgres URL, required when persistent  |

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => {
                info!("PORT not set, using default: {DEFAULT_PORT}");
                DEFAULT_PORT
            }
        };

        let persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(raw) => raw.trim().parse::<bool>().unwrap_or_else(|_| {
                warn!("Invalid USE_PERSISTENT_STORES value {raw:?}, falling back to in-memory");
                false
            }),
            None => false,
        };

        let storage = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self { port, storage })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
