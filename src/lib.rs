//! Ledger Engine Library
//! # Overview
//!
//! A concurrent in-memory ledger: account balances, an append-only
//! transaction log with rollback, bounded per-account balance history, and
//! the worker pool and batch runner used to apply commands in parallel.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Balance, Transaction, LedgerCommand, errors)
//! - [`core`] - Ledger components:
//!   - [`core::balance_store`] - Per-account balances with ordered locking
//!   - [`core::transaction_log`] - Transaction records and id assignment
//!   - [`core::history`] - Bounded balance history with point-in-time lookup
//!   - [`core::ledger`] - Credit, debit, transfer and rollback
//!   - [`core::async`] - Worker pool and batch runner
//! - [`io`] - CSV command parsing and balance output
//! - [`strategy`] - Replay pipelines (sync, worker pool, partitioned batches)
//! - [`cli`] - CLI arguments parsing and log setup
//!
//! # Operations
//!
//! - **Credit**: Add funds to an account
//! - **Debit**: Remove funds (requires sufficient balance)
//! - **Transfer**: Move funds between two accounts atomically
//! - **Rollback**: Reverse a completed operation; the original record is
//!   marked failed
//!
//! # Example
//!
//! ```
//! use ledger_engine::LedgerService;
//! use rust_decimal::Decimal;
//!
//! let ledger = LedgerService::default();
//! ledger.credit(1, Decimal::new(1000, 0)).unwrap();
//! let transfer = ledger.transfer(1, 2, Decimal::new(300, 0)).unwrap();
//! ledger.rollback(transfer.id).unwrap();
//!
//! assert_eq!(ledger.balance(1).amount, Decimal::new(1000, 0));
//! assert_eq!(ledger.balance(2).amount, Decimal::ZERO);
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use crate::core::{
    BalanceHistory, BalanceStore, BatchRunner, InMemoryBalanceStore, InMemoryTransactionLog,
    LedgerConfig, LedgerService, LedgerStats, PoolConfig, TransactionJob, TransactionLog,
    WorkerPool,
};
pub use io::write_balances_csv;
pub use types::{
    AccountId, Balance, HistoryEntry, LedgerCommand, LedgerError, Transaction, TransactionId,
    TransactionStatus, TransactionType,
};
