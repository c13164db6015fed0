use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::core::{LedgerConfig, PoolConfig, DEFAULT_HISTORY_LIMIT};
use crate::strategy::{BatchConfig, StrategySettings};

/// Replay ledger commands and print final account balances
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay ledger commands and print final account balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Replay strategy: 'sync', 'async' (worker pool) or 'batch' (partitioned batches)"
    )]
    pub strategy: StrategyType,

    /// Number of pool workers (async and batch modes)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of workers (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Queue capacity of the worker pool (async mode only)
    #[arg(
        long = "queue-capacity",
        value_name = "SIZE",
        help = "Maximum queued jobs before enqueue waits (default: 1000)"
    )]
    pub queue_capacity: Option<usize>,

    /// Number of records read per batch (async and batch modes)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Balance history entries kept per account
    #[arg(
        long = "history-limit",
        value_name = "COUNT",
        default_value_t = DEFAULT_HISTORY_LIMIT,
        help = "Balance history entries kept per account"
    )]
    pub history_limit: usize,

    /// Log filter, e.g. `info` or `ledger_engine=debug`
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        env = "LOG_LEVEL",
        default_value = "info"
    )]
    pub log_level: String,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
    Batch,
}

impl CliArgs {
    /// Create a PoolConfig from CLI arguments, falling back to defaults
    pub fn to_pool_config(&self) -> PoolConfig {
        let default = PoolConfig::default();
        PoolConfig::new(
            self.workers.unwrap_or(default.workers),
            self.queue_capacity.unwrap_or(default.queue_capacity),
        )
    }

    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        match self.batch_size {
            Some(batch_size) => BatchConfig::new(batch_size),
            None => BatchConfig::default(),
        }
    }

    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            history_limit: self.history_limit,
        }
    }

    pub fn to_settings(&self) -> StrategySettings {
        StrategySettings {
            ledger: self.to_ledger_config(),
            pool: self.to_pool_config(),
            batch: self.to_batch_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Sync)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    #[case::explicit_batch(&["program", "--strategy", "batch", "input.csv"], StrategyType::Batch)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], num_cpus::get(), 1000, 1000)]
    #[case::custom_workers(&["program", "--workers", "3", "input.csv"], 3, 1000, 1000)]
    #[case::custom_queue(&["program", "--queue-capacity", "10", "input.csv"], num_cpus::get(), 10, 1000)]
    #[case::custom_batch(&["program", "--batch-size", "50", "input.csv"], num_cpus::get(), 1000, 50)]
    #[case::zero_values_fall_back(
        &["program", "--workers", "0", "--queue-capacity", "0", "--batch-size", "0", "input.csv"],
        num_cpus::get(),
        1000,
        1000
    )]
    fn test_config_conversion(
        #[case] args: &[&str],
        #[case] workers: usize,
        #[case] queue_capacity: usize,
        #[case] batch_size: usize,
    ) {
        let settings = CliArgs::try_parse_from(args).unwrap().to_settings();

        assert_eq!(settings.pool.workers, workers);
        assert_eq!(settings.pool.queue_capacity, queue_capacity);
        assert_eq!(settings.batch.batch_size, batch_size);
    }

    #[test]
    fn test_history_limit() {
        let parsed = CliArgs::try_parse_from(["program", "--history-limit", "5", "input.csv"]).unwrap();
        assert_eq!(parsed.to_ledger_config().history_limit, 5);

        let parsed = CliArgs::try_parse_from(["program", "input.csv"]).unwrap();
        assert_eq!(parsed.to_ledger_config().history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_log_level_flag() {
        let parsed =
            CliArgs::try_parse_from(["program", "--log-level", "debug", "input.csv"]).unwrap();
        assert_eq!(parsed.log_level, "debug");
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::non_numeric_workers(&["program", "--workers", "many", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
