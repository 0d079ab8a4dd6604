//! Tracing configuration for the command-line entrypoints
//!
//! Diagnostics go to stderr so the narrative tee on stdout stays clean for
//! piping. `RUST_LOG` overrides the level chosen by the CLI flags.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber at the given level
pub fn init(level: Level) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smartspec={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;
    Ok(())
}

/// Level implied by the shared `--verbose` / `--debug` flags
pub fn level_from_flags(verbose: bool, debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}
