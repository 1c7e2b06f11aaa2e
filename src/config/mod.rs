//! Configuration system for xrtree
//!
//! A single YAML file layered over built-in defaults, with environment
//! overrides on top.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, RefreshConfig, TreeConfig};

use crate::relations::RootKind;

/// Keys accepted by `get_config_value`/`set_config_value`
pub const CONFIG_KEYS: &[&str] = &[
    "apiUrl",
    "requestTimeoutSeconds",
    "refresh.fullIntervalSeconds",
    "refresh.targetedIntervalSeconds",
    "tree.initialDepth",
    "tree.excludedKinds",
    "tree.staleRefreshLimit",
    "rootKinds",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "apiUrl" => Ok(config.api_url.clone()),
        "requestTimeoutSeconds" => Ok(config.request_timeout_seconds.to_string()),
        "refresh.fullIntervalSeconds" => Ok(config.refresh.full_interval_seconds.to_string()),
        "refresh.targetedIntervalSeconds" => {
            Ok(config.refresh.targeted_interval_seconds.to_string())
        }
        "tree.initialDepth" => Ok(config.tree.initial_depth.to_string()),
        "tree.excludedKinds" => Ok(config.tree.excluded_kinds.join(",")),
        "tree.staleRefreshLimit" => Ok(config.tree.stale_refresh_limit.to_string()),
        "rootKinds" => serde_yaml::to_string(&config.root_kinds)
            .map_err(|e| anyhow::anyhow!("Failed to serialize rootKinds: {}", e)),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    match key {
        "apiUrl" => {
            url::Url::parse(value).context("apiUrl must be a valid URL")?;
            config.api_url = value.to_string();
        }
        "requestTimeoutSeconds" => {
            config.request_timeout_seconds = parse_seconds(value).context("requestTimeoutSeconds must be a positive number")?;
        }
        "refresh.fullIntervalSeconds" => {
            config.refresh.full_interval_seconds = parse_seconds(value).context("refresh.fullIntervalSeconds must be a positive number")?;
        }
        "refresh.targetedIntervalSeconds" => {
            config.refresh.targeted_interval_seconds = parse_seconds(value).context("refresh.targetedIntervalSeconds must be a positive number")?;
        }
        "tree.initialDepth" => {
            config.tree.initial_depth = value
                .parse()
                .context("tree.initialDepth must be a number")?;
        }
        "tree.excludedKinds" => {
            config.tree.excluded_kinds = parse_list(value)
                .context("tree.excludedKinds must be a YAML array or comma-separated list")?;
        }
        "tree.staleRefreshLimit" => {
            config.tree.stale_refresh_limit = value
                .parse()
                .context("tree.staleRefreshLimit must be a number")?;
        }
        "rootKinds" => {
            let kinds: Vec<RootKind> = serde_yaml::from_str(value).context(
                "rootKinds must be a YAML array (e.g., [{group: skycluster.io, version: v1alpha1, resource: xinstances}])",
            )?;
            config.root_kinds = kinds;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

/// Parse a period in whole seconds; zero is rejected
fn parse_seconds(value: &str) -> anyhow::Result<u64> {
    let seconds: u64 = value.trim().parse()?;
    if seconds == 0 {
        anyhow::bail!("must be greater than 0");
    }
    Ok(seconds)
}

/// Parse a YAML array or a comma-separated list
fn parse_list(value: &str) -> anyhow::Result<Vec<String>> {
    if value.trim_start().starts_with('[') {
        Ok(serde_yaml::from_str(value)?)
    } else {
        Ok(value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
