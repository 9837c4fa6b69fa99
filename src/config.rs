use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::*;
use crate::error::{FilesError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub server: ServerConfig,
}

/// Where the CSV files live and how to reach them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub auth_token: String,
    pub timeout_seconds: u64,
    pub max_concurrency: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    /// Reads `path` if it exists, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path.as_ref())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path).map_err(|e| {
            FilesError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.source.base_url = url;
        }
        if let Some(token) = lookup(ENV_AUTH_TOKEN) {
            self.source.auth_token = token;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECONDS) {
            self.source.timeout_seconds = parse_env(ENV_TIMEOUT_SECONDS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            self.source.max_concurrency = parse_env(ENV_MAX_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PORT) {
            self.server.port = parse_env(ENV_PORT, &raw)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(FilesError::Config("source.base_url must not be empty".into()));
        }
        if self.source.max_concurrency == 0 {
            return Err(FilesError::Config("source.max_concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| FilesError::Config(format!("Invalid value '{}' for {}", raw, key)))
}
