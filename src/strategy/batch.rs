//! Partitioned batch replay strategy
//!
//! Reads commands in fixed-size batches. Each batch is planned into stages
//! split at its rollbacks; within a stage, commands are grouped by the
//! connected accounts they touch and every group runs as one unit on the
//! `BatchRunner`. A stage is joined before the next one starts.
//!
//! # Ordering
//!
//! - Commands linked through shared accounts (including both sides of a
//!   transfer) apply in file order, so final balances match sync replay for
//!   input without rollbacks
//! - Rollbacks apply after every earlier command and before any later one
//! - Transaction ids within a stage are assigned in completion order, so
//!   rollback ids only match file numbering when each stage holds a single
//!   group

use std::io::Write;
use std::path::Path;

use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, warn};

use crate::core::r#async::{plan_batch, BatchStage};
use crate::core::{BatchRunner, LedgerConfig, LedgerService, PoolConfig};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{apply_logged, finish, ProcessingStrategy};
use crate::types::{LedgerCommand, LedgerError};

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Configuration for batched reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing a zero batch size with the default
    pub fn new(batch_size: usize) -> Self {
        if batch_size == 0 {
            warn!(
                batch_size,
                default = DEFAULT_BATCH_SIZE,
                "invalid batch size, using default"
            );
            return Self::default();
        }

        Self { batch_size }
    }
}

/// Partitioned batch strategy
#[derive(Debug, Clone, Copy)]
pub struct BatchProcessingStrategy {
    ledger: LedgerConfig,
    pool: PoolConfig,
    batch: BatchConfig,
}

impl BatchProcessingStrategy {
    /// Create a new BatchProcessingStrategy
    ///
    /// `pool.workers` sizes the runtime; the queue capacity is unused.
    pub fn new(ledger: LedgerConfig, pool: PoolConfig, batch: BatchConfig) -> Self {
        Self {
            ledger,
            pool,
            batch,
        }
    }
}

impl ProcessingStrategy for BatchProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.pool.workers)
            .build()?;

        let ledger = LedgerService::in_memory(self.ledger);
        let runner = BatchRunner::new();

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::open_failed(input_path, e))?;
            let mut reader = AsyncReader::new(file.compat());
            debug!(path = %input_path.display(), "batch replay started");

            loop {
                let batch = reader.read_batch(self.batch.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for stage in plan_batch(batch) {
                    match stage {
                        BatchStage::Concurrent(groups) => {
                            let units: Vec<_> = groups
                                .into_iter()
                                .map(|commands| {
                                    let ledger = ledger.clone();
                                    move || {
                                        for command in commands {
                                            apply_logged(&ledger, command);
                                        }
                                    }
                                })
                                .collect();
                            runner.run(units).await;
                        }
                        BatchStage::Rollback(tx) => {
                            apply_logged(&ledger, LedgerCommand::Rollback { tx });
                        }
                    }
                }
            }

            Ok::<(), LedgerError>(())
        })?;

        finish(&ledger, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{create_temp_csv, parse_output};

    fn strategy(batch_size: usize) -> BatchProcessingStrategy {
        BatchProcessingStrategy::new(
            LedgerConfig::default(),
            PoolConfig::new(2, 1),
            BatchConfig::new(batch_size),
        )
    }

    #[test]
    fn test_batch_config_zero_falls_back_to_default() {
        assert_eq!(BatchConfig::new(0).batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(BatchConfig::new(5).batch_size, 5);
    }

    #[test]
    fn test_batch_strategy_keeps_per_account_order_across_batches() {
        let file = create_temp_csv(
            "deposit,1,,100,\ndeposit,2,,50,\nwithdraw,1,,30,\ndeposit,2,,25,\nwithdraw,1,,20,\n",
        );
        let mut output = Vec::new();

        strategy(2).process(file.path(), &mut output).unwrap();

        assert_eq!(
            parse_output(output),
            vec![(1, "50.0000".to_string()), (2, "75.0000".to_string())]
        );
    }

    #[test]
    fn test_batch_strategy_withdraw_before_deposit_fails_in_order() {
        let file = create_temp_csv("withdraw,1,,10,\ndeposit,1,,5,\ndeposit,2,,1,\n");
        let mut output = Vec::new();

        strategy(10).process(file.path(), &mut output).unwrap();

        assert_eq!(
            parse_output(output),
            vec![(1, "5.0000".to_string()), (2, "1.0000".to_string())]
        );
    }

    #[test]
    fn test_batch_strategy_single_command_batches_support_rollback() {
        let file = create_temp_csv("deposit,1,,1000,\ntransfer,1,2,300,\nrollback,,,,2\n");
        let mut output = Vec::new();

        strategy(1).process(file.path(), &mut output).unwrap();

        assert_eq!(
            parse_output(output),
            vec![(1, "1000.0000".to_string()), (2, "0.0000".to_string())]
        );
    }

    #[test]
    fn test_batch_strategy_transfer_chains_match_sync_replay() {
        let rows: String = (1..=200u64)
            .map(|i| {
                format!(
                    "deposit,{i},,10,\ntransfer,{i},{to},10,\nwithdraw,{to},,10,\n",
                    to = 1000 + i
                )
            })
            .collect();
        let file = create_temp_csv(&rows);
        let mut output = Vec::new();

        strategy(1000).process(file.path(), &mut output).unwrap();

        let balances = parse_output(output);
        assert_eq!(balances.len(), 400);
        assert!(balances.iter().all(|(_, balance)| balance == "0.0000"));
    }

    #[test]
    fn test_batch_strategy_rollback_runs_before_later_commands() {
        let file = create_temp_csv(
            "deposit,1,,1000,\ntransfer,1,2,300,\nrollback,,,,2\nwithdraw,2,,10,\n",
        );
        let mut output = Vec::new();

        strategy(10).process(file.path(), &mut output).unwrap();

        assert_eq!(
            parse_output(output),
            vec![(1, "1000.0000".to_string()), (2, "0.0000".to_string())]
        );
    }

    #[test]
    fn test_batch_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = strategy(10).process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }
}
