//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over ledger commands from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<LedgerCommand, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Applying: {:?}", command),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as Err variants in the iterator
//! - Errors carry the 1-based source line (the header is line 1)

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerCommand, LedgerError};

/// Synchronous CSV reader
///
/// Reads one record at a time; memory use does not grow with file size.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing empty columns may be omitted)
    /// - Use an 8KB buffer
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if the file opened successfully
    /// * `Err(LedgerError::FileNotFound)` if the file does not exist
    /// * `Err(LedgerError::IoError)` for any other open failure
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::open_failed(path, e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<LedgerCommand, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        match next {
            Ok(csv_record) => Some(convert_csv_record(csv_record, Some(self.line_num))),
            Err(e) => Some(Err(LedgerError::parse_error(
                Some(self.line_num),
                e.to_string(),
            ))),
        }
    }
}
