//! Logging initialization

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
/// Returns the log file path if debug logging is enabled
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if debug {
        if let Some((path, file)) = open_debug_log() {
            // Tree and graph output go to stdout, so debug logs go to a file
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
                )
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
            return Some(path);
        }
        eprintln!("Could not create a debug log file, logging to stderr");
    }

    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
    None
}

/// Create a named temp file that outlives the process
fn open_debug_log() -> Option<(PathBuf, std::fs::File)> {
    let temp_file = tempfile::Builder::new()
        .prefix("xrtree-")
        .suffix(".log")
        .tempfile()
        .ok()?;
    let (file, path) = temp_file.keep().ok()?;
    Some((path, file))
}
