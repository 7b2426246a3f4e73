//! Configuration for the projector

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Projector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name used in logs
    pub service_name: String,

    /// Read model database
    pub database: DatabaseConfig,

    /// Consumer mailbox capacity (events)
    pub mailbox_capacity: usize,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "journal-projector".to_string(),
            database: DatabaseConfig::default(),
            mailbox_capacity: 1000,
            json_logs: false,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL
    pub url: String,

    /// Pool size
    pub max_connections: u32,

    /// Acquire timeout (seconds)
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://journal.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    /// In-memory database on a single connection, for tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    /// Acquire timeout as a duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("JOURNAL_DATABASE_URL") {
            config.database.url = url;
        }

        if let Ok(n) = std::env::var("JOURNAL_DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse_var("JOURNAL_DATABASE_MAX_CONNECTIONS", &n)?;
        }

        if let Ok(secs) = std::env::var("JOURNAL_DATABASE_ACQUIRE_TIMEOUT_SECS") {
            config.database.acquire_timeout_secs =
                parse_var("JOURNAL_DATABASE_ACQUIRE_TIMEOUT_SECS", &secs)?;
        }

        if let Ok(capacity) = std::env::var("JOURNAL_MAILBOX_CAPACITY") {
            config.mailbox_capacity = parse_var("JOURNAL_MAILBOX_CAPACITY", &capacity)?;
        }

        if let Ok(json) = std::env::var("JOURNAL_JSON_LOGS") {
            config.json_logs = parse_var("JOURNAL_JSON_LOGS", &json)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(Error::Config("database url is empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config("max_connections must be positive".into()));
        }
        if self.mailbox_capacity == 0 {
            return Err(Error::Config("mailbox_capacity must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{name}: cannot parse {value:?}")))
}
