//! Thread-safe in-memory balance store
//!
//! This module provides `InMemoryBalanceStore`, which holds one balance record
//! per account and owns all locking around it.
//!
//! # Design
//!
//! Balances live behind a per-account `parking_lot::Mutex`, and the mutexes
//! are indexed by a `DashMap`. The map's shard locks are only held long enough
//! to clone the `Arc` of an account's slot; every read-modify-write happens
//! under the account's own mutex. This keeps unrelated accounts fully
//! independent and makes it safe to hold two account locks at once, which
//! `transfer` needs.
//!
//! # Lock Ordering
//!
//! `transfer` locks both accounts in ascending account-id order. It is the
//! only operation that holds more than one account lock, so the ordering rules
//! out deadlock between concurrent transfers in opposite directions.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::traits::BalanceStore;
use crate::types::{AccountId, Balance, LedgerError};

type Slot = Arc<Mutex<Balance>>;

/// Thread-safe balance store backed by `DashMap` and per-account mutexes
///
/// # Thread Safety
///
/// - Mutations on the same account are serialized by the account's mutex
/// - Mutations on different accounts proceed in parallel
/// - A reader never observes a balance mid-update
#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    balances: DashMap<AccountId, Slot>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    /// Number of accounts that have a balance record
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Get the account's slot, creating a zero balance on first use
    ///
    /// The returned `Arc` is detached from the map, so no shard lock is held
    /// once this returns.
    fn slot(&self, account: AccountId) -> Slot {
        if let Some(slot) = self.balances.get(&account) {
            return Arc::clone(slot.value());
        }

        let slot = self
            .balances
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(Balance::new(account))));
        Arc::clone(slot.value())
    }
}

impl BalanceStore for InMemoryBalanceStore {
    fn get(&self, account: AccountId) -> Balance {
        self.slot(account).lock().clone()
    }

    fn add(&self, account: AccountId, delta: Decimal) -> Result<Balance, LedgerError> {
        let slot = self.slot(account);
        let mut balance = slot.lock();

        let updated = balance
            .amount
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("add", account))?;

        if updated < Decimal::ZERO {
            return Err(LedgerError::insufficient_funds(
                account,
                balance.amount,
                -delta,
            ));
        }

        balance.commit(updated);
        Ok(balance.clone())
    }

    fn subtract(&self, account: AccountId, amount: Decimal) -> Result<Balance, LedgerError> {
        let slot = self.slot(account);
        let mut balance = slot.lock();

        if amount > balance.amount {
            return Err(LedgerError::insufficient_funds(
                account,
                balance.amount,
                amount,
            ));
        }

        let updated = balance
            .amount
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("subtract", account))?;

        balance.commit(updated);
        Ok(balance.clone())
    }

    fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(Balance, Balance), LedgerError> {
        if from == to {
            return Err(LedgerError::self_transfer(from));
        }

        let from_slot = self.slot(from);
        let to_slot = self.slot(to);

        // Lower account id first
        let (mut source, mut destination) = if from < to {
            let source = from_slot.lock();
            let destination = to_slot.lock();
            (source, destination)
        } else {
            let destination = to_slot.lock();
            let source = from_slot.lock();
            (source, destination)
        };

        if amount > source.amount {
            return Err(LedgerError::insufficient_funds(from, source.amount, amount));
        }

        let debited = source
            .amount
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", from))?;
        let credited = destination
            .amount
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", to))?;

        source.commit(debited);
        destination.commit(credited);

        Ok((source.clone(), destination.clone()))
    }

    fn all(&self) -> Vec<Balance> {
        let slots: Vec<Slot> = self
            .balances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        slots.iter().map(|slot| slot.lock().clone()).collect()
    }
}
