//! Account balance types for the ledger engine
//!
//! This module defines the `Balance` record held by the balance store for
//! every account, together with the identifier type used to key it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Account identifier
///
/// Accounts are logically permanent: once an identifier has been seen it owns
/// exactly one balance for the lifetime of the ledger.
pub type AccountId = u64;

/// Current balance of a single account
///
/// Balances are created lazily with a zero amount on first lookup or mutation
/// and are only ever changed through the balance store's add/subtract/transfer
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    /// The account owning this balance
    pub account: AccountId,

    /// Current amount, never negative after a committed mutation
    pub amount: Decimal,

    /// Time of the last successful mutation
    ///
    /// Monotonic per account: a mutation never moves it backwards, even if
    /// the wall clock does.
    pub last_updated: DateTime<Utc>,

    /// Number of committed mutations applied to this balance
    ///
    /// Used to keep history entries in mutation order when concurrent
    /// writers record them out of order.
    pub version: u64,
}

impl Balance {
    /// Create a zero balance for the given account
    pub fn new(account: AccountId) -> Self {
        Balance {
            account,
            amount: Decimal::ZERO,
            last_updated: Utc::now(),
            version: 0,
        }
    }

    /// Commit a new amount, advancing the timestamp and version
    pub(crate) fn commit(&mut self, amount: Decimal) {
        let now = Utc::now();
        self.amount = amount;
        if now > self.last_updated {
            self.last_updated = now;
        }
        self.version += 1;
    }
}
