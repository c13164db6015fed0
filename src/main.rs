//! Ledger Engine CLI
//!
//! Replays ledger commands from a CSV file and prints the final balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > balances.csv
//! cargo run -- --strategy async --workers 8 --queue-capacity 500 commands.csv > balances.csv
//! cargo run -- --strategy batch --batch-size 2000 commands.csv > balances.csv
//! LOG_LEVEL=debug cargo run -- commands.csv
//! ```
//!
//! # Replay Strategies
//!
//! - **sync**: Commands applied one at a time in file order (default)
//! - **async**: Commands fed through a bounded worker pool
//! - **batch**: Fixed-size batches grouped by linked accounts and run in parallel
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, file not readable, output failure)

use ledger_engine::cli;
use ledger_engine::strategy;
use std::process;
use tracing::error;

fn main() {
    let args = cli::parse_args();
    cli::init_logging(&args.log_level);

    let strategy = strategy::create_strategy(args.strategy, args.to_settings());

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "replay failed");
        process::exit(1);
    }
}
