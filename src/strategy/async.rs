//! Worker pool replay strategy
//!
//! Reads commands in chunks with `AsyncReader` and feeds them to a
//! `WorkerPool`, whose workers apply them to a shared ledger concurrently.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── tokio multi-threaded runtime (pool.workers threads)
//!     ├── AsyncReader (chunked CSV reading, batch.batch_size per read)
//!     └── WorkerPool (bounded queue, pool.workers workers)
//!         └── LedgerService (shared, internally synchronized)
//! ```
//!
//! # Ordering
//!
//! Commands are dequeued in file order but run concurrently, so two commands
//! touching the same account may apply in either order. Per-command
//! atomicity and every ledger invariant still hold; only the interleaving is
//! unspecified. A rollback that overtakes the command it references fails
//! with `TransactionNotFound`.

use std::io::Write;
use std::path::Path;

use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::debug;

use crate::core::{LedgerConfig, LedgerService, PoolConfig, WorkerPool};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{finish, BatchConfig, ProcessingStrategy};
use crate::types::LedgerError;

/// Asynchronous worker pool strategy
#[derive(Debug, Clone, Copy)]
pub struct AsyncProcessingStrategy {
    ledger: LedgerConfig,
    pool: PoolConfig,
    batch: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `ledger` - Ledger configuration
    /// * `pool` - Worker count and queue capacity
    /// * `batch` - Number of records read from the file per chunk
    pub fn new(ledger: LedgerConfig, pool: PoolConfig, batch: BatchConfig) -> Self {
        Self {
            ledger,
            pool,
            batch,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the file through the worker pool
    ///
    /// The pool is always stopped, and therefore drained, before balances are
    /// written.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.pool.workers)
            .build()?;

        let ledger = LedgerService::in_memory(self.ledger);

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::open_failed(input_path, e))?;
            let mut reader = AsyncReader::new(file.compat());

            let pool = WorkerPool::for_ledger(self.pool, ledger.clone());
            debug!(path = %input_path.display(), "async replay started");

            let mut enqueued = Ok(());
            'read: loop {
                let batch = reader.read_batch(self.batch.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for command in batch {
                    enqueued = pool.enqueue(command).await;
                    if enqueued.is_err() {
                        break 'read;
                    }
                }
            }

            pool.stop().await;
            enqueued
        })?;

        finish(&ledger, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{create_temp_csv, parse_output};

    fn strategy(workers: usize, queue_capacity: usize, batch_size: usize) -> AsyncProcessingStrategy {
        AsyncProcessingStrategy::new(
            LedgerConfig::default(),
            PoolConfig::new(workers, queue_capacity),
            BatchConfig::new(batch_size),
        )
    }

    #[test]
    fn test_async_strategy_processes_deposits_for_many_accounts() {
        let rows: String = (1..=20)
            .flat_map(|account| (0..5).map(move |_| format!("deposit,{},,10,\n", account)))
            .collect();
        let file = create_temp_csv(&rows);
        let mut output = Vec::new();

        strategy(4, 8, 7).process(file.path(), &mut output).unwrap();

        let balances = parse_output(output);
        assert_eq!(balances.len(), 20);
        assert!(balances.iter().all(|(_, balance)| balance == "50.0000"));
    }

    #[test]
    fn test_async_strategy_single_worker_preserves_file_order() {
        let file = create_temp_csv(
            "deposit,1,,100,\nwithdraw,1,,30,\ntransfer,1,2,20,\nrollback,,,,3\nwithdraw,1,,50,\n",
        );
        let mut output = Vec::new();

        strategy(1, 2, 2).process(file.path(), &mut output).unwrap();

        assert_eq!(
            parse_output(output),
            vec![(1, "20.0000".to_string()), (2, "0.0000".to_string())]
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = strategy(2, 4, 4).process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }
}
