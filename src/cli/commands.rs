//! CLI command handlers

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use std::sync::Arc;

use crate::client::{HttpResourceClient, ResourceClient};
use crate::config::{self, Config, ConfigLoader, paths};
use crate::models::{ExtendedResource, split_api_version};
use crate::relations::{Forest, TreeBuilder, graph_from_extended, render_trees};
use crate::scheduler::RefreshScheduler;

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "apiUrl", "tree.initialDepth")
        key: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "apiUrl", "tree.initialDepth")
        key: String,
        /// Configuration value
        value: String,
    },
    /// List all configuration
    List,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

/// Which relation view to build
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphKind {
    Composite,
    Claim,
    Managed,
}

/// Handle configuration subcommands
pub async fn handle_config_command(cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;

            if let Some(key) = key {
                let value = config::get_config_value(&config, &key)?;
                println!("{}", value);
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set { key, value } => {
            // Start from the file alone so env overrides are not persisted
            let path = paths::root_config_path();
            let mut config = if path.exists() {
                ConfigLoader::load_file(&path)?
            } else {
                ConfigLoader::load_defaults()
            };

            config::set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;

            ConfigLoader::save_root(&config).context("Failed to save configuration")?;
            println!("Configuration saved");
        }
        ConfigSubcommand::List => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;
            for key in config::CONFIG_KEYS {
                let value = config::get_config_value(&config, key)?;
                if value.contains('\n') {
                    println!("{}:\n{}", key, value.trim_end());
                } else {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigSubcommand::Path => {
            println!("{}", paths::root_config_path().display());
        }
        ConfigSubcommand::Validate => match ConfigLoader::validate() {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => {
                eprintln!("Configuration validation failed: {:#}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Build the resource client for tree commands
async fn resource_client(
    config: &Config,
    use_kube: bool,
    context: Option<&str>,
) -> Result<Arc<dyn ResourceClient>> {
    if use_kube {
        let client = crate::kube::create_client(context).await?;
        tracing::debug!("Reading resources from the cluster API");
        Ok(Arc::new(crate::kube::KubeResourceClient::new(client)))
    } else {
        tracing::debug!("Reading resources from {}", config.api_url);
        Ok(Arc::new(HttpResourceClient::new(
            &config.api_url,
            config.request_timeout(),
        )?))
    }
}

/// Discover roots, build the forest once and print it
pub async fn run_tree(
    config: &Config,
    depth: Option<usize>,
    use_kube: bool,
    context: Option<&str>,
    filter: Option<&str>,
) -> Result<()> {
    let mut options = config.tree_options();
    if let Some(depth) = depth {
        options.initial_depth = depth;
    }

    let client = resource_client(config, use_kube, context).await?;
    let builder = TreeBuilder::new(client, options);
    let forest = builder.build_forest().await;

    print!("{}", render_forest(&forest, filter, false));
    Ok(())
}

/// Run the refresh scheduler and reprint the forest on every update
pub async fn run_watch(
    config: &Config,
    use_kube: bool,
    context: Option<&str>,
    filter: Option<&str>,
) -> Result<()> {
    let client = resource_client(config, use_kube, context).await?;
    let builder = TreeBuilder::new(client, config.tree_options());
    let handle = RefreshScheduler::new(builder, config.refresh_intervals()).spawn();
    let mut view = handle.subscribe();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    tracing::warn!("Refresh scheduler stopped");
                    break;
                }
                let forest = view.borrow_and_update().forest.clone();
                let updated = forest
                    .last_updated
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("--- last full refresh: {} ---", updated);
                print!("{}", render_forest(&forest, filter, false));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    Ok(())
}

fn render_forest(forest: &Forest, filter: Option<&str>, follow_expanded: bool) -> String {
    render_trees(&forest.filter_roots(filter.unwrap_or("")), follow_expanded)
}

/// Fetch one resource's extended view from the backend and print its
/// relation graph as JSON
pub async fn run_graph(
    config: &Config,
    kind: GraphKind,
    api_version: &str,
    resource_kind: &str,
    name: &str,
    namespace: Option<&str>,
) -> Result<()> {
    let (group, version) = split_api_version(api_version)
        .with_context(|| format!("apiVersion must be group/version: {}", api_version))?;
    let client = HttpResourceClient::new(&config.api_url, config.request_timeout())?;

    let resource = match kind {
        GraphKind::Composite => ExtendedResource::Composite(
            client
                .get_composite(group, version, resource_kind, name)
                .await?,
        ),
        GraphKind::Claim => {
            let namespace = namespace.context("claims need --namespace")?;
            ExtendedResource::Claim(
                client
                    .get_claim(group, version, resource_kind, namespace, name)
                    .await?,
            )
        }
        GraphKind::Managed => ExtendedResource::Managed(
            client
                .get_managed(group, version, resource_kind, name)
                .await?,
        ),
    };

    let graph = graph_from_extended(&resource);
    let json = serde_json::to_string_pretty(&graph).context("Failed to serialize graph")?;
    println!("{}", json);
    Ok(())
}
