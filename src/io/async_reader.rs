//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of ledger commands from any `futures::io::AsyncRead`
//! source, for the async and batch replay strategies.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerCommand, LedgerError};

/// Asynchronous CSV reader
///
/// Invalid records are logged and skipped; only valid commands are returned.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    rejected: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            rejected: 0,
        }
    }

    /// Read up to `batch_size` valid commands
    ///
    /// Returns an empty vector once the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.line_num += 1;

            let converted = next
                .map_err(|e| LedgerError::parse_error(Some(self.line_num), e.to_string()))
                .and_then(|record| convert_csv_record(record, Some(self.line_num)));

            match converted {
                Ok(command) => batch.push(command),
                Err(error) => {
                    self.rejected += 1;
                    warn!(%error, "skipping record");
                }
            }
        }

        batch
    }

    /// Number of records skipped so far
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
