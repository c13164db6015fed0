//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `account`: Account balance records
//! - `transaction`: Transaction records, statuses and ledger commands
//! - `history`: Balance history snapshots
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod history;
pub mod transaction;

pub use account::{AccountId, Balance};
pub use error::LedgerError;
pub use history::HistoryEntry;
pub use transaction::{
    LedgerCommand, Transaction, TransactionId, TransactionStatus, TransactionType,
};
