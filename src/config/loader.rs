//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{paths, schema::Config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding `apiUrl`
pub const API_URL_ENV: &str = "XRTREE_API_URL";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Config> {
        let path = paths::root_config_path();
        let config = if path.exists() {
            Self::load_file(&path)?
        } else {
            Self::load_defaults()
        };

        let config = Self::apply_env_overrides(config, std::env::var(API_URL_ENV).ok());
        Self::check(&config)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from a file. Keys missing from the file keep their
    /// built-in defaults.
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(Self::load_defaults());
        }

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the root config file (when present) and the merged result
    pub fn validate() -> Result<()> {
        let root_path = paths::root_config_path();
        if root_path.exists() {
            let config = Self::load_file(&root_path)?;
            Self::check(&config)
                .with_context(|| format!("Invalid config file: {}", root_path.display()))?;
        }

        Self::load().context("Failed to load merged configuration")?;
        Ok(())
    }

    /// Semantic checks serde cannot express
    pub fn check(config: &Config) -> Result<()> {
        url::Url::parse(&config.api_url)
            .with_context(|| format!("apiUrl is not a valid URL: {}", config.api_url))?;

        if config.request_timeout_seconds == 0 {
            anyhow::bail!("requestTimeoutSeconds must be greater than 0");
        }
        if config.refresh.full_interval_seconds == 0 {
            anyhow::bail!("refresh.fullIntervalSeconds must be greater than 0");
        }
        if config.refresh.targeted_interval_seconds == 0 {
            anyhow::bail!("refresh.targetedIntervalSeconds must be greater than 0");
        }
        if config.refresh.targeted_interval_seconds >= config.refresh.full_interval_seconds {
            tracing::warn!(
                "refresh.targetedIntervalSeconds ({}) is not shorter than refresh.fullIntervalSeconds ({})",
                config.refresh.targeted_interval_seconds,
                config.refresh.full_interval_seconds
            );
        }

        for kind in &config.root_kinds {
            if kind.group.is_empty() || kind.version.is_empty() || kind.resource.is_empty() {
                anyhow::bail!(
                    "rootKinds entries need group, version and resource: {:?}",
                    kind
                );
            }
        }

        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        Config::default()
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config, api_url: Option<String>) -> Config {
        if let Some(api_url) = api_url.filter(|u| !u.is_empty()) {
            config.api_url = api_url;
        }
        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}
