//! Synchronous replay strategy
//!
//! Streams commands one at a time through `SyncReader` and applies each to the
//! ledger on the calling thread, in file order. This is the only strategy
//! whose output is fully deterministic for any input, including rollbacks
//! that reference ids assigned earlier in the same file.
//!
//! # Design
//!
//! The strategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Money movement to `LedgerService`
//! - CSV output to `csv_format::write_balances_csv`

use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::{LedgerConfig, LedgerService};
use crate::io::sync_reader::SyncReader;
use crate::strategy::{apply_logged, finish, ProcessingStrategy};
use crate::types::LedgerError;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use ledger_engine::core::LedgerConfig;
/// use ledger_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("commands.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncProcessingStrategy {
    ledger: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(ledger: LedgerConfig) -> Self {
        Self { ledger }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let ledger = LedgerService::in_memory(self.ledger);
        let reader = SyncReader::new(input_path)?;
        debug!(path = %input_path.display(), "sync replay started");

        for result in reader {
            match result {
                Ok(command) => apply_logged(&ledger, command),
                Err(error) => warn!(%error, "skipping record"),
            }
        }

        finish(&ledger, output)
    }
}
