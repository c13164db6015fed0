// CLI module
// Command-line interface, argument parsing and log setup

mod args;

pub use args::{CliArgs, StrategyType};

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints a message and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Install the global tracing subscriber
///
/// Logs go to stderr so stdout carries only the balance report. `filter` uses
/// `EnvFilter` syntax; an unparsable filter falls back to `info`.
pub fn init_logging(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
