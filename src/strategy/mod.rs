//! Replay strategies for command files
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering CSV parsing, applying commands to a ledger and writing the final
//! balances. The implementation (sequential, worker pool, partitioned
//! batches) is selected at runtime.

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::cli::StrategyType;
use crate::core::traits::{BalanceStore, TransactionLog};
use crate::core::{LedgerConfig, LedgerService, PoolConfig};
use crate::io::csv_format::write_balances_csv;
use crate::types::{LedgerCommand, LedgerError};

pub mod r#async;
pub mod batch;
pub mod sync;

pub use self::r#async::AsyncProcessingStrategy;
pub use batch::{BatchConfig, BatchProcessingStrategy};
pub use sync::SyncProcessingStrategy;

/// Replay pipeline from a command file to a balance report
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the commands in `input_path` and write final balances to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the file was replayed, even if individual commands failed
    /// * `Err(LedgerError)` if a fatal error occurred (file not found, I/O error)
    ///
    /// Individual command failures are logged and do not abort the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Settings shared by every strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategySettings {
    pub ledger: LedgerConfig,
    pub pool: PoolConfig,
    pub batch: BatchConfig,
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Which pipeline to build
/// * `settings` - Ledger, pool and batch configuration; each strategy uses
///   the parts relevant to it
pub fn create_strategy(
    strategy_type: StrategyType,
    settings: StrategySettings,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(settings.ledger)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            settings.ledger,
            settings.pool,
            settings.batch,
        )),
        StrategyType::Batch => Box::new(BatchProcessingStrategy::new(
            settings.ledger,
            settings.pool,
            settings.batch,
        )),
    }
}

/// Apply a command, logging rather than returning a failure
pub(crate) fn apply_logged<B: BalanceStore, L: TransactionLog>(
    ledger: &LedgerService<B, L>,
    command: LedgerCommand,
) {
    if let Err(error) = ledger.apply(command.clone()) {
        warn!(?command, %error, "command failed");
    }
}

/// Write the ledger's final balances and log its counters
pub(crate) fn finish<B: BalanceStore, L: TransactionLog>(
    ledger: &LedgerService<B, L>,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let stats = ledger.stats();
    info!(
        completed = stats.completed,
        failed = stats.failed,
        reversed = stats.reversed,
        total = %ledger.total_balance(),
        "replay finished"
    );

    write_balances_csv(&ledger.balances(), output)
}
