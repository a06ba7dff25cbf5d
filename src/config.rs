//! TOML configuration.
//!
//! Every section and key is optional; a missing file falls back to
//! [`Config::default`]. Example:
//!
//! ```toml
//! [tree]
//! path = "data/mds.json"
//! snapshot_path = "data/mds-temp.json"
//!
//! [crawler]
//! base_url = "https://www.librarything.com/mds/"
//! concurrency = 12
//!
//! [oracle]
//! provider = "openai"
//! model = "gpt-4.1"
//! temperature = 0.0
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TreeConfig {
    #[serde(default = "default_tree_path")]
    pub path: PathBuf,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            path: default_tree_path(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_tree_path() -> PathBuf {
    PathBuf::from("data/mds.json")
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/mds-temp.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_crawler_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            concurrency: default_concurrency(),
            timeout_secs: default_crawler_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.librarything.com/mds/".to_string()
}
fn default_concurrency() -> usize {
    12
}
fn default_crawler_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    format!("mds-harness/{}", env!("CARGO_PKG_VERSION"))
}

/// Upper bound for `crawler.concurrency`.
pub const MAX_CONCURRENCY: usize = 64;

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_oracle_timeout_secs(),
            max_retries: default_max_retries(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4.1".to_string()
}
fn default_oracle_timeout_secs() -> u64 {
    60
}

impl OracleConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Load and validate the configuration at `path`.
///
/// A missing file yields the defaults; a file that exists but cannot be
/// read or parsed is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate crawler
    if config.crawler.concurrency == 0 || config.crawler.concurrency > MAX_CONCURRENCY {
        anyhow::bail!("crawler.concurrency must be in 1..={}", MAX_CONCURRENCY);
    }

    if !config.crawler.base_url.ends_with('/') {
        anyhow::bail!("crawler.base_url must end with '/'");
    }

    // Validate oracle
    if !(0.0..=2.0).contains(&config.oracle.temperature) {
        anyhow::bail!("oracle.temperature must be in [0.0, 2.0]");
    }

    match config.oracle.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown oracle provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.tree.path, PathBuf::from("data/mds.json"));
        assert_eq!(config.crawler.concurrency, 12);
        assert_eq!(config.oracle.provider, "openai");
        assert_eq!(config.oracle.temperature, 0.0);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [tree]
            path = "out/tree.json"

            [crawler]
            concurrency = 4

            [oracle]
            provider = "ollama"
            model = "llama3"
            url = "http://localhost:11434"
            "#,
        )
        .unwrap();

        assert_eq!(config.tree.path, PathBuf::from("out/tree.json"));
        assert_eq!(config.tree.snapshot_path, PathBuf::from("data/mds-temp.json"));
        assert_eq!(config.crawler.concurrency, 4);
        assert_eq!(config.crawler.max_retries, 3);
        assert_eq!(config.oracle.model, "llama3");
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = parse_config("[crawler]\nconcurrency = 0\n").unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_rejects_base_url_without_slash() {
        assert!(parse_config("[crawler]\nbase_url = \"https://example.com/mds\"\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[oracle]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown oracle provider"));
    }

    #[test]
    fn test_oracle_enabled() {
        assert!(Config::default().oracle.is_enabled());
        let config = parse_config("[oracle]\nprovider = \"disabled\"\n").unwrap();
        assert!(!config.oracle.is_enabled());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = load_config(Path::new("/nonexistent/mds.toml")).unwrap();
        assert_eq!(config.crawler.base_url, "https://www.librarything.com/mds/");
    }
}
