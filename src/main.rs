//! xrtree - relation graphs and live resource trees for a composite-resource
//! control plane
//!
//! Reads resources from the dashboard backend (or the cluster API directly)
//! and prints either the relation graph of one resource or the forest of
//! composite resources, optionally kept current by the refresh scheduler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use xrtree::cli::{self, ConfigSubcommand, GraphKind};
use xrtree::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "xrtree", version)]
#[command(about = "Relation graphs and live resource trees for composite resources", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Build the resource forest once and print it
    Tree {
        /// Levels fetched below each root
        #[arg(long)]
        depth: Option<usize>,
        /// Read from the cluster API instead of the dashboard backend
        #[arg(long)]
        kube: bool,
        /// Kubeconfig context (with --kube)
        #[arg(long, requires = "kube")]
        context: Option<String>,
        /// Only show roots whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Keep the forest current and reprint it on every change
    Watch {
        /// Read from the cluster API instead of the dashboard backend
        #[arg(long)]
        kube: bool,
        /// Kubeconfig context (with --kube)
        #[arg(long, requires = "kube")]
        context: Option<String>,
        /// Only show roots whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Print the relation graph of one resource as JSON
    Graph {
        #[arg(value_enum)]
        kind: GraphKind,
        /// e.g. skycluster.io/v1alpha1
        api_version: String,
        resource_kind: String,
        name: String,
        /// Namespace (claims only)
        #[arg(long, short = 'n')]
        namespace: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let command = match args.command {
        Command::Config { subcommand } => return cli::handle_config_command(subcommand).await,
        command => command,
    };

    let config = ConfigLoader::load().context("Failed to load configuration")?;
    tracing::debug!(
        "Configuration loaded: apiUrl={}, initialDepth={}",
        config.api_url,
        config.tree.initial_depth
    );

    match command {
        Command::Tree {
            depth,
            kube,
            context,
            filter,
        } => cli::run_tree(&config, depth, kube, context.as_deref(), filter.as_deref()).await,
        Command::Watch {
            kube,
            context,
            filter,
        } => cli::run_watch(&config, kube, context.as_deref(), filter.as_deref()).await,
        Command::Graph {
            kind,
            api_version,
            resource_kind,
            name,
            namespace,
        } => {
            cli::run_graph(
                &config,
                kind,
                &api_version,
                &resource_kind,
                &name,
                namespace.as_deref(),
            )
            .await
        }
        Command::Config { .. } => Ok(()),
    }
}
