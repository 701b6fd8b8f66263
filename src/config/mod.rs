//! Configuration loading for the Opérateurs Bio API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BIO_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Application configuration derived from `BIO_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// URL of the open-data CSV feed used by `/create_init_db`.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Whole-request timeout for the feed fetch, in seconds.
    #[serde(default = "default_feed_timeout_seconds")]
    pub feed_timeout_seconds: u64,
    /// Number of feed rows committed per ingestion transaction.
    #[serde(default = "default_ingest_batch_size")]
    pub ingest_batch_size: usize,
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Validates the configuration, returning an error if a setting is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_bind_addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: self.api_bind_addr.clone(),
                source,
            })?;

        Url::parse(&self.feed_url).map_err(|source| ConfigError::InvalidFeedUrl {
            value: self.feed_url.clone(),
            source,
        })?;

        if self.feed_timeout_seconds == 0 {
            return Err(ConfigError::InvalidFeedTimeout {
                value: self.feed_timeout_seconds,
            });
        }

        if self.ingest_batch_size == 0 {
            return Err(ConfigError::InvalidIngestBatchSize {
                value: self.ingest_batch_size,
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            feed_url: default_feed_url(),
            feed_timeout_seconds: default_feed_timeout_seconds(),
            ingest_batch_size: default_ingest_batch_size(),
        }
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://operateurs_bio.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_feed_url() -> String {
    "https://www.data.gouv.fr/fr/datasets/r/657789db-d349-4554-aef6-eabde4bd1c57".to_string()
}

fn default_feed_timeout_seconds() -> u64 {
    120
}

fn default_ingest_batch_size() -> usize {
    500
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid feed url '{value}': {source}")]
    InvalidFeedUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("feed timeout must be positive, got {value}")]
    InvalidFeedTimeout { value: u64 },
    #[error("ingest batch size must be positive, got {value}")]
    InvalidIngestBatchSize { value: usize },
}

/// Loads configuration using layered `.env` files and `BIO_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration, later layers winning: `.env`, `.env.<profile>`,
    /// `.env.local`, then the process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut layered = BTreeMap::new();

        self.merge_env_file(&mut layered, ".env")?;

        // The profile decides which profile file to layer next; the process
        // environment can still override it afterwards.
        let profile_hint = env::var("BIO_PROFILE")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| layered.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_env_file(&mut layered, &format!(".env.{}", profile_hint))?;
        self.merge_env_file(&mut layered, ".env.local")?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("BIO_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let take = |layered: &mut BTreeMap<String, String>, key: &str| {
            layered.remove(key).filter(|v| !v.is_empty())
        };

        let config = AppConfig {
            profile: take(&mut layered, "PROFILE").unwrap_or(profile_hint),
            api_bind_addr: take(&mut layered, "API_BIND_ADDR")
                .unwrap_or_else(default_api_bind_addr),
            log_level: take(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level),
            log_format: take(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format),
            database_url: take(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url),
            db_max_connections: take(&mut layered, "DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_db_max_connections),
            db_acquire_timeout_ms: take(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_db_acquire_timeout_ms),
            feed_url: take(&mut layered, "FEED_URL").unwrap_or_else(default_feed_url),
            feed_timeout_seconds: take(&mut layered, "FEED_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_feed_timeout_seconds),
            ingest_batch_size: take(&mut layered, "INGEST_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_batch_size),
        };

        config.validate()?;

        Ok(config)
    }

    /// Merge one env file into the layered map, keeping `BIO_`-prefixed keys only.
    /// A missing file is not an error; any other I/O or parse failure is.
    fn merge_env_file(
        &self,
        layered: &mut BTreeMap<String, String>,
        file_name: &str,
    ) -> Result<(), ConfigError> {
        let path = self.base_dir.join(file_name);

        let iter = match dotenvy::from_path_iter(&path) {
            Ok(iter) => iter,
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                return Ok(());
            }
            Err(source) => return Err(ConfigError::EnvFile { path, source }),
        };

        for item in iter {
            let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                path: path.clone(),
                source,
            })?;
            if let Some(stripped) = key.strip_prefix("BIO_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
