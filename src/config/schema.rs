//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::relations::{RootKind, TreeOptions, default_excluded_kinds, default_root_kinds};
use crate::scheduler::RefreshIntervals;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Dashboard backend base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout for backend calls
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Refresh timers
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Tree construction
    #[serde(default)]
    pub tree: TreeConfig,

    /// Kinds listed as tree roots
    #[serde(default = "default_root_kinds")]
    pub root_kinds: Vec<RootKind>,
}

/// Refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshConfig {
    /// Full rebuild period
    #[serde(default = "default_full_interval_seconds")]
    pub full_interval_seconds: u64,

    /// Period of the unready-node refresh
    #[serde(default = "default_targeted_interval_seconds")]
    pub targeted_interval_seconds: u64,
}

/// Tree configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    /// Levels fetched below each root on a build
    #[serde(default = "default_initial_depth")]
    pub initial_depth: usize,

    /// Kinds never shown as tree nodes (case-insensitive)
    #[serde(default = "default_excluded_kinds")]
    pub excluded_kinds: Vec<String>,

    /// Refreshes a child may be missing from before it is dropped (0 = never)
    #[serde(default = "default_stale_refresh_limit")]
    pub stale_refresh_limit: u32,
}

fn default_api_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_full_interval_seconds() -> u64 {
    195
}

fn default_targeted_interval_seconds() -> u64 {
    15
}

fn default_initial_depth() -> usize {
    1
}

fn default_stale_refresh_limit() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            refresh: RefreshConfig::default(),
            tree: TreeConfig::default(),
            root_kinds: default_root_kinds(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            full_interval_seconds: default_full_interval_seconds(),
            targeted_interval_seconds: default_targeted_interval_seconds(),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_depth: default_initial_depth(),
            excluded_kinds: default_excluded_kinds(),
            stale_refresh_limit: default_stale_refresh_limit(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn refresh_intervals(&self) -> RefreshIntervals {
        RefreshIntervals {
            full: Duration::from_secs(self.refresh.full_interval_seconds),
            targeted: Duration::from_secs(self.refresh.targeted_interval_seconds),
        }
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            root_kinds: self.root_kinds.clone(),
            excluded_kinds: self.tree.excluded_kinds.clone(),
            initial_depth: self.tree.initial_depth,
            stale_refresh_limit: self.tree.stale_refresh_limit,
        }
    }
}
