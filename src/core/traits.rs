//! Storage traits behind the ledger service
//!
//! The ledger service only talks to balances and transactions through these
//! narrow interfaces, so a durable backend can replace the in-memory stores
//! without touching the money-movement logic.

use rust_decimal::Decimal;

use crate::types::{AccountId, Balance, LedgerError, Transaction, TransactionId};

/// Keyed store of account balances
///
/// Implementations own their locking: one mutation per account at a time,
/// with no blocking between unrelated accounts.
pub trait BalanceStore: Send + Sync {
    /// Current balance of an account, creating a zero balance if absent
    fn get(&self, account: AccountId) -> Balance;

    /// Atomically add `delta` to the balance
    ///
    /// `delta` may be negative for internal use; a result below zero is
    /// rejected with `InsufficientFunds` and leaves the balance unchanged.
    fn add(&self, account: AccountId, delta: Decimal) -> Result<Balance, LedgerError>;

    /// Atomically subtract `amount`, failing with `InsufficientFunds` if it
    /// exceeds the current balance
    ///
    /// This is the sole gate against negative balances.
    fn subtract(&self, account: AccountId, amount: Decimal) -> Result<Balance, LedgerError>;

    /// Atomically move `amount` from one account to another
    ///
    /// Either both legs are applied or neither is. Returns the post-mutation
    /// snapshots of `(from, to)`.
    fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(Balance, Balance), LedgerError>;

    /// Snapshot of every known balance, in no particular order
    fn all(&self) -> Vec<Balance>;
}

/// Append-only log of transaction records
pub trait TransactionLog: Send + Sync {
    /// Assign the next id to `transaction`, store it and return the id
    fn create(&self, transaction: Transaction) -> TransactionId;

    /// Look up a transaction by id
    fn find_by_id(&self, id: TransactionId) -> Result<Transaction, LedgerError>;

    /// All transactions where `account` is source or destination
    ///
    /// Snapshot semantics only; ordering is not stable across calls.
    fn list_by_account(&self, account: AccountId) -> Vec<Transaction>;

    /// Atomically update a stored transaction through a closure
    ///
    /// No other caller observes or modifies the record while `f` runs.
    fn update<F, T>(&self, id: TransactionId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, LedgerError>;

    /// Snapshot of every stored transaction, in no particular order
    fn all(&self) -> Vec<Transaction>;
}
