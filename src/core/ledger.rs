//! Ledger service: credit, debit, transfer and rollback orchestration
//!
//! This module provides `LedgerService`, which applies money movements against
//! a balance store, a transaction log and the balance history tracker.
//!
//! # Architecture
//!
//! ```text
//! LedgerService
//!     ├── Arc<B: BalanceStore>     (per-account locked balances)
//!     ├── Arc<L: TransactionLog>   (transaction records, id assignment)
//!     ├── Arc<BalanceHistory>      (bounded per-account snapshots)
//!     └── Arc<LedgerCounters>      (completed/failed/rolled-back counts)
//! ```
//!
//! # Transaction Lifecycle
//!
//! Every operation first creates a pending record, then attempts the balance
//! mutation, then finalizes the record to completed or failed before
//! returning. Input that is invalid on its face (non-positive amount, transfer
//! to self) is rejected before a record is created.
//!
//! Rollback is the exception: it mutates the original record in place
//! (`completed → failed`, stamping `rolled_back_at`) and creates neither a
//! record nor a history entry.
//!
//! # Thread Safety
//!
//! The service is cheap to clone and safe to share across threads and tasks.
//! All state lives in the Arc-wrapped stores, which do their own locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::balance_store::InMemoryBalanceStore;
use super::history::{BalanceHistory, DEFAULT_HISTORY_LIMIT};
use super::traits::{BalanceStore, TransactionLog};
use super::transaction_log::InMemoryTransactionLog;
use crate::types::{
    AccountId, Balance, HistoryEntry, LedgerCommand, LedgerError, Transaction, TransactionId,
    TransactionStatus,
};

/// Ledger-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Balance history entries retained per account
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Point-in-time counts of finalized transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub completed: u64,
    pub failed: u64,
    /// Completed transactions later undone by a rollback
    pub reversed: u64,
}

#[derive(Debug, Default)]
struct LedgerCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    reversed: AtomicU64,
}

/// A committed balance change: the post-mutation snapshot and the signed delta
type Movement = (Balance, Decimal);

/// Orchestrates money movement across the ledger's stores
#[derive(Debug)]
pub struct LedgerService<B = InMemoryBalanceStore, L = InMemoryTransactionLog> {
    balances: Arc<B>,
    transactions: Arc<L>,
    history: Arc<BalanceHistory>,
    counters: Arc<LedgerCounters>,
}

impl<B, L> Clone for LedgerService<B, L> {
    fn clone(&self) -> Self {
        Self {
            balances: Arc::clone(&self.balances),
            transactions: Arc::clone(&self.transactions),
            history: Arc::clone(&self.history),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl LedgerService {
    /// Create a memory-resident ledger
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryBalanceStore::new()),
            Arc::new(InMemoryTransactionLog::new()),
            Arc::new(BalanceHistory::new(config.history_limit)),
        )
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::in_memory(LedgerConfig::default())
    }
}

impl<B: BalanceStore, L: TransactionLog> LedgerService<B, L> {
    pub fn new(balances: Arc<B>, transactions: Arc<L>, history: Arc<BalanceHistory>) -> Self {
        Self {
            balances,
            transactions,
            history,
            counters: Arc::new(LedgerCounters::default()),
        }
    }

    /// Deposit `amount` into `account`
    ///
    /// # Returns
    ///
    /// * `Ok(Transaction)` - The completed deposit record
    /// * `Err(LedgerError::InvalidAmount)` - If `amount` is not positive
    /// * `Err(LedgerError::ArithmeticOverflow)` - If the balance would overflow
    pub fn credit(&self, account: AccountId, amount: Decimal) -> Result<Transaction, LedgerError> {
        ensure_positive(amount, "credit")?;

        let id = self.transactions.create(Transaction::deposit(account, amount));
        let outcome = self
            .balances
            .add(account, amount)
            .map(|balance| vec![(balance, amount)]);

        self.finalize(id, outcome)
    }

    /// Withdraw `amount` from `account`
    ///
    /// # Returns
    ///
    /// * `Ok(Transaction)` - The completed withdrawal record
    /// * `Err(LedgerError::InvalidAmount)` - If `amount` is not positive
    /// * `Err(LedgerError::InsufficientFunds)` - If `amount` exceeds the
    ///   balance; the balance is unchanged and the record is marked failed
    pub fn debit(&self, account: AccountId, amount: Decimal) -> Result<Transaction, LedgerError> {
        ensure_positive(amount, "debit")?;

        let id = self.transactions.create(Transaction::withdraw(account, amount));
        let outcome = self
            .balances
            .subtract(account, amount)
            .map(|balance| vec![(balance, -amount)]);

        self.finalize(id, outcome)
    }

    /// Move `amount` from `from` to `to`
    ///
    /// Both legs are applied under the two accounts' locks, so no observer
    /// sees the debit without the credit. On any failure neither balance
    /// changes and the record is marked failed.
    ///
    /// # Returns
    ///
    /// * `Ok(Transaction)` - The completed transfer record
    /// * `Err(LedgerError::InvalidAmount)` - If `amount` is not positive
    /// * `Err(LedgerError::SelfTransfer)` - If `from == to`
    /// * `Err(LedgerError::InsufficientFunds)` - If `from` cannot cover `amount`
    /// * `Err(LedgerError::ArithmeticOverflow)` - If `to` would overflow
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        ensure_positive(amount, "transfer")?;
        if from == to {
            return Err(LedgerError::self_transfer(from));
        }

        let id = self
            .transactions
            .create(Transaction::transfer(from, to, amount));
        let outcome = self
            .balances
            .transfer(from, to, amount)
            .map(|(source, destination)| vec![(source, -amount), (destination, amount)]);

        self.finalize(id, outcome)
    }

    /// Undo the balance effect of a completed transaction
    ///
    /// The original record moves to `Failed` and records `rolled_back_at`.
    /// No new record or history entry is created. If the reverse movement
    /// cannot be applied the original stays `Completed`.
    ///
    /// # Returns
    ///
    /// * `Ok(Transaction)` - The rolled-back record
    /// * `Err(LedgerError::TransactionNotFound)` - If `tx` does not exist
    /// * `Err(LedgerError::InvalidTransactionState)` - If `tx` is not completed
    /// * `Err(LedgerError::InsufficientFunds)` - If the credited account has
    ///   since spent the funds being taken back
    pub fn rollback(&self, tx: TransactionId) -> Result<Transaction, LedgerError> {
        // The record's entry stays locked while its balance effect is undone,
        // so concurrent rollbacks of the same transaction serialize here.
        let outcome = self.transactions.update(tx, |record| {
            if record.status != TransactionStatus::Completed {
                return Err(LedgerError::invalid_transaction_state(
                    tx,
                    record.status,
                    "rollback",
                ));
            }
            self.reverse_effect(record)?;
            record.mark_rolled_back(Utc::now())?;
            Ok(record.clone())
        });

        match outcome {
            Ok(transaction) => {
                self.counters.reversed.fetch_add(1, Ordering::Relaxed);
                debug!(tx, tx_type = %transaction.tx_type, "transaction rolled back");
                Ok(transaction)
            }
            Err(LedgerError::TransactionNotFound { .. }) => {
                Err(LedgerError::transaction_not_found(tx, "rollback"))
            }
            Err(error) => {
                warn!(tx, %error, "rollback rejected");
                Err(error)
            }
        }
    }

    /// Apply a single ledger command
    pub fn apply(&self, command: LedgerCommand) -> Result<Transaction, LedgerError> {
        match command {
            LedgerCommand::Credit { account, amount } => self.credit(account, amount),
            LedgerCommand::Debit { account, amount } => self.debit(account, amount),
            LedgerCommand::Transfer { from, to, amount } => self.transfer(from, to, amount),
            LedgerCommand::Rollback { tx } => self.rollback(tx),
        }
    }

    /// Current balance of an account (zero if never touched)
    pub fn balance(&self, account: AccountId) -> Balance {
        self.balances.get(account)
    }

    /// Snapshot of every account balance
    pub fn balances(&self) -> Vec<Balance> {
        self.balances.all()
    }

    /// Sum of all account balances
    pub fn total_balance(&self) -> Decimal {
        self.balances
            .all()
            .iter()
            .fold(Decimal::ZERO, |total, balance| total + balance.amount)
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.transactions.find_by_id(id)
    }

    /// Transactions involving `account`, ordered by id
    pub fn transactions_for(&self, account: AccountId) -> Vec<Transaction> {
        let mut transactions = self.transactions.list_by_account(account);
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    /// Every transaction record, ordered by id
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut transactions = self.transactions.all();
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    pub fn history(&self, account: AccountId) -> Vec<HistoryEntry> {
        self.history.history(account)
    }

    /// Balance snapshot recorded closest to `at`
    pub fn balance_at(
        &self,
        account: AccountId,
        at: DateTime<Utc>,
    ) -> Result<HistoryEntry, LedgerError> {
        self.history.nearest_at(account, at)
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            reversed: self.counters.reversed.load(Ordering::Relaxed),
        }
    }

    /// Apply the inverse balance movement of `original`
    ///
    /// The amount flows from the original destination back to the original
    /// source, whichever of them exist.
    fn reverse_effect(&self, original: &Transaction) -> Result<(), LedgerError> {
        let amount = original.amount;
        match (original.source, original.destination) {
            (None, Some(destination)) => self.balances.subtract(destination, amount).map(drop),
            (Some(source), None) => self.balances.add(source, amount).map(drop),
            (Some(source), Some(destination)) => self
                .balances
                .transfer(destination, source, amount)
                .map(drop),
            (None, None) => Err(LedgerError::invalid_transaction_state(
                original.id,
                original.status,
                "rollback",
            )),
        }
    }

    /// Finalize a pending record from the mutation outcome
    ///
    /// Marks the record completed and records history on success, or marks it
    /// failed and surfaces the error.
    fn finalize(
        &self,
        id: TransactionId,
        outcome: Result<Vec<Movement>, LedgerError>,
    ) -> Result<Transaction, LedgerError> {
        match outcome {
            Ok(movements) => {
                let transaction = self.transactions.update(id, |tx| {
                    tx.complete()?;
                    Ok(tx.clone())
                })?;

                for (balance, delta) in movements {
                    self.history.record(
                        balance.account,
                        HistoryEntry::from_balance(&balance, delta, Some(id)),
                    );
                }

                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    tx = id,
                    tx_type = %transaction.tx_type,
                    amount = %transaction.amount,
                    "transaction completed"
                );
                Ok(transaction)
            }
            Err(error) => {
                self.transactions.update(id, |tx| tx.fail())?;
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(tx = id, %error, "transaction failed");
                Err(error)
            }
        }
    }
}

fn ensure_positive(amount: Decimal, operation: &str) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount, operation));
    }
    Ok(())
}
