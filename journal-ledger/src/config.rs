//! Configuration for the command processor

use crate::address::{FAMILY_NAME, FAMILY_VERSION};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Processor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name used in logs
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Transaction family this processor handles
    pub family: FamilyConfig,

    /// Record prometheus counters
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "journal-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            family: FamilyConfig::default(),
            metrics_enabled: true,
        }
    }
}

/// Transaction family identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyConfig {
    /// Family name, also the namespace seed
    pub name: String,

    /// Accepted family versions
    pub versions: Vec<String>,
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            name: FAMILY_NAME.to_string(),
            versions: vec![FAMILY_VERSION.to_string()],
        }
    }
}

impl FamilyConfig {
    /// Whether a transaction header names this family
    pub fn accepts(&self, name: &str, version: &str) -> bool {
        self.name == name && self.versions.iter().any(|v| v == version)
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

        if let Ok(name) = std::env::var("JOURNAL_FAMILY_NAME") {
            config.family.name = name;
        }

        if let Ok(versions) = std::env::var("JOURNAL_FAMILY_VERSIONS") {
            config.family.versions = versions
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(enabled) = std::env::var("JOURNAL_METRICS_ENABLED") {
            config.metrics_enabled = enabled
                .parse()
                .map_err(|_| Error::Config(format!("JOURNAL_METRICS_ENABLED: {enabled}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.family.name.is_empty() {
            return Err(Error::Config("family name is empty".into()));
        }
        if self.family.versions.is_empty() {
            return Err(Error::Config("no family version configured".into()));
        }
        Ok(())
    }
}
