//! Error types for the ledger engine
//!
//! This module defines all error types that can occur while applying ledger
//! commands or replaying them from CSV input.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: unknown transaction, account without history
//! - **Mutation Errors**: insufficient funds, arithmetic overflow
//! - **State Errors**: rollback of a transaction that is not completed
//! - **Validation Errors**: non-positive amounts, transfers to self
//! - **Replay Errors**: file not found, I/O and CSV parse failures

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;
use super::transaction::{TransactionId, TransactionStatus};

/// Main error type for the ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Input file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading input or writing output
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error
    ///
    /// Recoverable during replay: the malformed command is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Referenced transaction does not exist
    #[error("Transaction {tx} not found for {operation}")]
    TransactionNotFound {
        tx: TransactionId,
        /// Operation that failed
        operation: String,
    },

    /// Account has no recorded balance history
    #[error("No balance history for account {account}")]
    HistoryNotFound { account: AccountId },

    /// Subtracting would make the balance negative
    ///
    /// The balance is left unchanged and the transaction is marked failed.
    #[error("Insufficient funds for account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        /// Balance at the time of the attempt
        available: Decimal,
        requested: Decimal,
    },

    /// Operation requires a transaction in a different status
    #[error("Transaction {tx} is {status}, cannot {operation}")]
    InvalidTransactionState {
        tx: TransactionId,
        status: TransactionStatus,
        operation: String,
    },

    /// Amount is zero or negative
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount { amount: Decimal, operation: String },

    /// Transfer source and destination are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SelfTransfer { account: AccountId },

    /// Arithmetic overflow would occur
    ///
    /// The mutation is rejected to keep the balance representable.
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    /// The worker pool is no longer accepting jobs
    #[error("Worker pool is closed")]
    PoolClosed,
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for LedgerError {
    fn from(error: csv_async::Error) -> Self {
        LedgerError::ParseError {
            line: None,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn file_not_found(path: &str) -> Self {
        LedgerError::FileNotFound {
            path: path.to_string(),
        }
    }

    /// Classify a failure to open `path`
    pub fn open_failed(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(&path.display().to_string()),
            _ => Self::from(error),
        }
    }

    pub fn parse_error(line: Option<u64>, message: impl Into<String>) -> Self {
        LedgerError::ParseError {
            line,
            message: message.into(),
        }
    }

    pub fn transaction_not_found(tx: TransactionId, operation: &str) -> Self {
        LedgerError::TransactionNotFound {
            tx,
            operation: operation.to_string(),
        }
    }

    pub fn history_not_found(account: AccountId) -> Self {
        LedgerError::HistoryNotFound { account }
    }

    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    pub fn invalid_transaction_state(
        tx: TransactionId,
        status: TransactionStatus,
        operation: &str,
    ) -> Self {
        LedgerError::InvalidTransactionState {
            tx,
            status,
            operation: operation.to_string(),
        }
    }

    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    pub fn self_transfer(account: AccountId) -> Self {
        LedgerError::SelfTransfer { account }
    }

    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }
}
