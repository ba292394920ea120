//! Run configuration, loadable from a TOML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Base URL of the catalog site the route paths are relative to.
    pub base_url: String,

    pub fetch: FetchConfig,

    /// Bounded worker pool size for fetches within a tier.
    pub concurrency: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Initial backoff in seconds; doubled on every retried attempt.
    pub backoff_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://climbing-history.org".to_string(),
            fetch: FetchConfig::default(),
            concurrency: 8,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "cragmap/0.1 (route location enrichment)".to_string(),
            timeout_secs: 10,
            max_attempts: 5,
            backoff_secs: 1,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
