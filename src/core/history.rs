//! Per-account balance history with bounded retention
//!
//! `BalanceHistory` keeps, for every account, the most recent balance
//! snapshots in mutation order. Each account's log is capped; the oldest
//! entries are evicted first once the cap is exceeded.
//!
//! Entries are ordered by the balance version they were taken at rather than
//! by arrival, so two writers that commit mutations in one order and record
//! them in the other still produce an ordered history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::{AccountId, HistoryEntry, LedgerError};

/// Default number of entries retained per account
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug)]
pub struct BalanceHistory {
    entries: DashMap<AccountId, VecDeque<HistoryEntry>>,
    limit: usize,
}

impl BalanceHistory {
    /// Create a tracker retaining at most `limit` entries per account
    ///
    /// A zero limit is treated as 1.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: DashMap::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append an entry to the account's history, evicting from the front
    /// when over the limit
    pub fn record(&self, account: AccountId, entry: HistoryEntry) {
        let mut log = self.entries.entry(account).or_default();

        let in_order = log
            .back()
            .map_or(true, |last| last.version <= entry.version);
        if in_order {
            log.push_back(entry);
        } else {
            let position = log.partition_point(|existing| existing.version <= entry.version);
            log.insert(position, entry);
        }

        while log.len() > self.limit {
            log.pop_front();
        }
    }

    /// The account's retained history, oldest first
    ///
    /// Accounts with no history yield an empty vector.
    pub fn history(&self, account: AccountId) -> Vec<HistoryEntry> {
        self.entries
            .get(&account)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The entry whose timestamp is closest to `target`
    ///
    /// On equal distance the later entry wins.
    pub fn nearest_at(
        &self,
        account: AccountId,
        target: DateTime<Utc>,
    ) -> Result<HistoryEntry, LedgerError> {
        let log = self
            .entries
            .get(&account)
            .ok_or_else(|| LedgerError::history_not_found(account))?;

        let mut nearest: Option<(&HistoryEntry, chrono::TimeDelta)> = None;
        for entry in log.iter() {
            let distance = (target - entry.recorded_at).abs();
            match nearest {
                Some((_, best)) if distance > best => {}
                _ => nearest = Some((entry, distance)),
            }
        }

        nearest
            .map(|(entry, _)| entry.clone())
            .ok_or_else(|| LedgerError::history_not_found(account))
    }
}

impl Default for BalanceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
