use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where uploaded binaries go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    /// An external upload endpoint that files are posted into a folder of.
    Http {
        endpoint: String,
        folder_id: String,
        public_url: Option<String>,
    },
    /// A local directory, served elsewhere under `public_url`.
    LocalDir { root: PathBuf, public_url: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub addr: SocketAddr,
    pub session_inactivity_hours: i64,
    pub session_secure: bool,
    /// Shared with the authenticating proxy; sign-ins without it are refused.
    pub proxy_secret: String,
    pub storage: StorageConfig,
}

impl Config {
    /// Reads the configuration from the environment, loading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let storage = match env::var("STORAGE_ENDPOINT").ok() {
            Some(endpoint) => StorageConfig::Http {
                endpoint,
                folder_id: required("STORAGE_FOLDER_ID")?,
                public_url: env::var("STORAGE_PUBLIC_URL").ok(),
            },
            None => StorageConfig::LocalDir {
                root: try_load("STORAGE_DIR", "uploads")?,
                public_url: try_load("STORAGE_PUBLIC_URL", "/files")?,
            },
        };

        let proxy_secret = required("PROXY_SECRET")?;
        if proxy_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "PROXY_SECRET",
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            addr: try_load("PORTAL_ADDR", "127.0.0.1:3000")?,
            session_inactivity_hours: try_load("SESSION_INACTIVITY_HOURS", "24")?,
            session_secure: try_load("SESSION_SECURE", "false")?,
            proxy_secret,
            storage,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
