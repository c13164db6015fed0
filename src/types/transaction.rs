//! Transaction-related types for the ledger engine
//!
//! This module defines the transaction record kept by the transaction log,
//! its type and status enums, and the `LedgerCommand` requests callers submit
//! to the ledger service (directly or through the worker pool).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::error::LedgerError;

/// Transaction identifier
///
/// Assigned by the transaction log on creation. Ids start at 1 and are dense.
pub type TransactionId = u64;

/// Kinds of money movement recorded by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Credit funds to the destination account
    Deposit,

    /// Debit funds from the source account
    Withdraw,

    /// Move funds from the source to the destination account
    Transfer,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a transaction
///
/// ```text
/// pending ──► completed ──(rollback)──► failed
///    │                                    ▲
///    └────────────────────────────────────┘
/// ```
///
/// `failed` is terminal. `completed` is terminal for everything except
/// rollback, which is recorded on the transaction through `rolled_back_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A transaction record as stored in the transaction log
///
/// Deposits carry only a destination, withdrawals only a source, transfers
/// both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Identifier assigned by the transaction log (0 until created)
    pub id: TransactionId,

    /// Account debited by this transaction
    pub source: Option<AccountId>,

    /// Account credited by this transaction
    pub destination: Option<AccountId>,

    /// Amount moved, always positive
    pub amount: Decimal,

    pub tx_type: TransactionType,

    pub status: TransactionStatus,

    pub created_at: DateTime<Utc>,

    /// When a rollback undid this transaction's balance effect
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl Transaction {
    fn pending(
        tx_type: TransactionType,
        source: Option<AccountId>,
        destination: Option<AccountId>,
        amount: Decimal,
    ) -> Self {
        Transaction {
            id: 0,
            source,
            destination,
            amount,
            tx_type,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            rolled_back_at: None,
        }
    }

    /// Pending deposit into `account`
    pub fn deposit(account: AccountId, amount: Decimal) -> Self {
        Self::pending(TransactionType::Deposit, None, Some(account), amount)
    }

    /// Pending withdrawal from `account`
    pub fn withdraw(account: AccountId, amount: Decimal) -> Self {
        Self::pending(TransactionType::Withdraw, Some(account), None, amount)
    }

    /// Pending transfer from `from` to `to`
    pub fn transfer(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self::pending(TransactionType::Transfer, Some(from), Some(to), amount)
    }

    /// Whether `account` is the source or destination of this transaction
    pub fn involves(&self, account: AccountId) -> bool {
        self.source == Some(account) || self.destination == Some(account)
    }

    /// Transition pending → completed
    pub fn complete(&mut self) -> Result<(), LedgerError> {
        self.finish(TransactionStatus::Completed, "complete")
    }

    /// Transition pending → failed
    pub fn fail(&mut self) -> Result<(), LedgerError> {
        self.finish(TransactionStatus::Failed, "fail")
    }

    /// Transition completed → failed after a rollback
    pub fn mark_rolled_back(&mut self, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Completed {
            return Err(LedgerError::invalid_transaction_state(
                self.id,
                self.status,
                "rollback",
            ));
        }
        self.status = TransactionStatus::Failed;
        self.rolled_back_at = Some(at);
        Ok(())
    }

    fn finish(&mut self, status: TransactionStatus, operation: &str) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Pending {
            return Err(LedgerError::invalid_transaction_state(
                self.id,
                self.status,
                operation,
            ));
        }
        self.status = status;
        Ok(())
    }
}

/// A request to mutate the ledger
///
/// This is the unit callers hand to `LedgerService::apply` and the payload of
/// jobs queued on the worker pool.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    Credit {
        account: AccountId,
        amount: Decimal,
    },
    Debit {
        account: AccountId,
        amount: Decimal,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
    Rollback {
        tx: TransactionId,
    },
}

impl LedgerCommand {
    /// Accounts whose balances this command reads or writes
    ///
    /// Transfers touch both accounts. Rollbacks reference a transaction
    /// rather than an account and touch none by name.
    pub fn accounts(&self) -> [Option<AccountId>; 2] {
        match self {
            LedgerCommand::Credit { account, .. } | LedgerCommand::Debit { account, .. } => {
                [Some(*account), None]
            }
            LedgerCommand::Transfer { from, to, .. } => [Some(*from), Some(*to)],
            LedgerCommand::Rollback { .. } => [None, None],
        }
    }
}
