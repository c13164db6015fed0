//! Core ledger module
//!
//! This module contains the ledger components:
//! - `traits` - Storage abstractions the service is generic over
//! - `balance_store` - Per-account balances
//! - `transaction_log` - Transaction records and id assignment
//! - `history` - Bounded per-account balance history
//! - `ledger` - The service composing the above
//! - `async` - Worker pool and batch runner

pub mod balance_store;
pub mod history;
pub mod ledger;
pub mod r#async;
pub mod traits;
pub mod transaction_log;

pub use balance_store::InMemoryBalanceStore;
pub use history::{BalanceHistory, DEFAULT_HISTORY_LIMIT};
pub use ledger::{LedgerConfig, LedgerService, LedgerStats};
pub use r#async::{BatchRunner, PoolConfig, TransactionJob, WorkerPool};
pub use traits::{BalanceStore, TransactionLog};
pub use transaction_log::InMemoryTransactionLog;
