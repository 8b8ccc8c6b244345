use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::version::registries::github::DEFAULT_BASE_URL;

// =============================================================================
// Constants
// =============================================================================

/// Default cache TTL in milliseconds (1 hour)
pub const DEFAULT_CACHE_TTL_MS: u64 = 60 * 60 * 1000;

/// Page size requested from the hosting API (GitHub's maximum)
pub const PER_PAGE: u32 = 100;

/// Environment variable consulted for the API token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub provider: ProviderConfig,
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// GitHub provider configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API token; requests are anonymous when absent
    pub token: Option<String>,
    pub base_url: String,
    /// Cache TTL in milliseconds
    pub cache_ttl: u64,
}

impl ProviderConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL_MS,
        }
    }
}

/// A named remote version source
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub remote: RemoteVersion,
}

/// Declarative description of where and how to read remote versions
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVersion {
    /// Repository in the form `owner/name`
    pub repo: String,
    /// `releases` or `tags`
    pub strategy: String,
    pub extraction: ExtractionConfig,
    /// Version constraint; empty means no filtering
    #[serde(default)]
    pub constraint: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    pub regex: RegexExtraction,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegexExtraction {
    pub pattern: String,
    /// Result template referencing capture groups, e.g. `$1`
    #[serde(default = "default_result")]
    pub result: String,
}

fn default_result() -> String {
    "$1".to_string()
}
