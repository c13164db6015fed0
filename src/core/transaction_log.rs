//! Thread-safe in-memory transaction log
//!
//! This module provides `InMemoryTransactionLog`, the append-only store of
//! transaction records.
//!
//! # Design
//!
//! Records are kept in a `DashMap` keyed by transaction id, so lookups and
//! status updates on different transactions do not contend. Id assignment is
//! the one global serialization point: an `AtomicU64` owned by the log hands
//! out ids starting at 1, which keeps them dense and collision-free under
//! concurrent creation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::traits::TransactionLog;
use crate::types::{AccountId, LedgerError, Transaction, TransactionId};

/// Thread-safe transaction log backed by `DashMap`
#[derive(Debug)]
pub struct InMemoryTransactionLog {
    transactions: DashMap<TransactionId, Transaction>,

    /// Next id to hand out
    next_id: AtomicU64,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for InMemoryTransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLog for InMemoryTransactionLog {
    fn create(&self, mut transaction: Transaction) -> TransactionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        transaction.id = id;
        self.transactions.insert(id, transaction);
        id
    }

    fn find_by_id(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.transactions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::transaction_not_found(id, "lookup"))
    }

    fn list_by_account(&self, account: AccountId) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|entry| entry.value().involves(account))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn update<F, T>(&self, id: TransactionId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, LedgerError>,
    {
        match self.transactions.get_mut(&id) {
            Some(mut entry) => f(entry.value_mut()),
            None => Err(LedgerError::transaction_not_found(id, "update")),
        }
    }

    fn all(&self) -> Vec<Transaction> {
        self.transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
