//! Application configuration.
//!
//! Every setting has a default; `AppConfig::from_env` overlays values taken
//! from the process environment, and `AppConfig::with_overrides` applies the
//! command-line flags on top. This module is the only reader of the
//! environment: flags beat environment variables, which beat defaults.

use std::path::PathBuf;

use thiserror::Error;

use crate::provider::arxiv::ArxivConfig;
use crate::server::ServerConfig;
use crate::DEFAULT_PAPER_DIR;

/// Environment variable naming the cache root directory.
pub const ENV_PAPER_DIR: &str = "PAPER_DIR";
pub const ENV_ARXIV_API_URL: &str = "ARXIV_API_URL";
pub const ENV_ARXIV_TIMEOUT_SECS: &str = "ARXIV_TIMEOUT_SECS";
pub const ENV_ARXIV_REQUEST_INTERVAL_MS: &str = "ARXIV_REQUEST_INTERVAL_MS";
pub const ENV_ARXIV_MAX_RETRIES: &str = "ARXIV_MAX_RETRIES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration shared by both binaries.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of the topic store
    pub paper_dir: PathBuf,

    pub arxiv: ArxivConfig,

    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paper_dir: PathBuf::from(DEFAULT_PAPER_DIR),
            arxiv: ArxivConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values produced by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_PAPER_DIR).filter(|v| !v.trim().is_empty()) {
            config.paper_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(ENV_ARXIV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.arxiv.base_url = url;
        }
        if let Some(value) = lookup(ENV_ARXIV_TIMEOUT_SECS) {
            config.arxiv.timeout_secs = parse_number(ENV_ARXIV_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_ARXIV_REQUEST_INTERVAL_MS) {
            config.arxiv.request_interval_ms = parse_number(ENV_ARXIV_REQUEST_INTERVAL_MS, value)?;
        }
        if let Some(value) = lookup(ENV_ARXIV_MAX_RETRIES) {
            config.arxiv.max_retries = parse_number(ENV_ARXIV_MAX_RETRIES, value)?;
        }

        Ok(config)
    }

    /// Apply command-line flags; `None` keeps the current value.
    pub fn with_overrides(mut self, paper_dir: Option<PathBuf>, arxiv_url: Option<String>) -> Self {
        if let Some(dir) = paper_dir {
            self.paper_dir = dir;
        }
        if let Some(url) = arxiv_url {
            self.arxiv.base_url = url;
        }
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
