//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod logging;

pub use commands::{
    ConfigSubcommand, GraphKind, handle_config_command, run_graph, run_tree, run_watch,
};
pub use logging::init_logging;
