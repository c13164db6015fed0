//! Balance history entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::account::{AccountId, Balance};
use super::transaction::TransactionId;

/// Snapshot of an account's balance taken right after a committed mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub account: AccountId,

    /// Balance after the mutation
    pub amount: Decimal,

    /// Signed change applied by the mutation
    pub delta: Decimal,

    /// Transaction that caused the mutation, if any
    pub transaction: Option<TransactionId>,

    pub recorded_at: DateTime<Utc>,

    /// Balance version this snapshot corresponds to
    pub version: u64,
}

impl HistoryEntry {
    /// Build an entry from a post-mutation balance snapshot
    pub fn from_balance(
        balance: &Balance,
        delta: Decimal,
        transaction: Option<TransactionId>,
    ) -> Self {
        HistoryEntry {
            account: balance.account,
            amount: balance.amount,
            delta,
            transaction,
            recorded_at: balance.last_updated,
            version: balance.version,
        }
    }
}
