//! Fire-and-join execution of independent units of work
//!
//! This module provides `BatchRunner`, which runs a set of zero-argument units
//! concurrently and returns once all of them have finished, plus the
//! batch planning the batch replay strategy uses to build those units.
//!
//! # Design
//!
//! Units are plain closures, so they run on tokio's blocking pool rather than
//! on the async workers. A panicking unit is logged and does not affect the
//! others; no results are collected.
//!
//! # Ordering
//!
//! `partition_connected` groups commands by the connected components of the
//! accounts they touch: a transfer joins its source and destination. Commands
//! sharing a group stay in input order inside one unit, so any command that
//! can observe another's effect runs after it. Unrelated groups proceed in
//! parallel.
//!
//! `plan_batch` splits a batch at every rollback. Rollbacks name a
//! transaction rather than an account, so each one runs alone after every
//! earlier command and before any later one.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::types::{AccountId, LedgerCommand, TransactionId};

/// Runs batches of independent units and waits for all of them
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunner;

impl BatchRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run every unit concurrently and return once all have completed
    ///
    /// # Arguments
    ///
    /// * `units` - Closures to run; an empty batch returns immediately
    ///
    /// # Guarantees
    ///
    /// - Every unit has finished (or panicked) when this returns
    /// - A panic in one unit is logged and does not cancel the others
    pub async fn run<F>(&self, units: Vec<F>)
    where
        F: FnOnce() + Send + 'static,
    {
        if units.is_empty() {
            return;
        }

        let count = units.len();
        debug!(units = count, "batch started");

        let mut tasks = JoinSet::new();
        for (index, unit) in units.into_iter().enumerate() {
            tasks.spawn_blocking(move || {
                debug!(unit = index, "batch unit started");
                unit();
                debug!(unit = index, "batch unit finished");
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "batch unit panicked");
            }
        }

        debug!(units = count, "batch finished");
    }
}

/// One step of a planned batch
#[derive(Debug, PartialEq)]
pub enum BatchStage {
    /// Independent command groups, each to run as one unit
    Concurrent(Vec<Vec<LedgerCommand>>),

    /// Rollback to apply once every earlier stage has joined
    Rollback(TransactionId),
}

/// Split a batch into stages separated by its rollbacks
///
/// Stages are returned in input order. Empty runs between rollbacks produce
/// no `Concurrent` stage.
pub fn plan_batch(batch: Vec<LedgerCommand>) -> Vec<BatchStage> {
    let mut stages = Vec::new();
    let mut run = Vec::new();

    for command in batch {
        match command {
            LedgerCommand::Rollback { tx } => {
                if !run.is_empty() {
                    stages.push(BatchStage::Concurrent(partition_connected(
                        std::mem::take(&mut run),
                    )));
                }
                stages.push(BatchStage::Rollback(tx));
            }
            command => run.push(command),
        }
    }

    if !run.is_empty() {
        stages.push(BatchStage::Concurrent(partition_connected(run)));
    }
    stages
}

/// Group commands by the connected components of the accounts they touch
///
/// Each command lands in exactly one group and relative order is preserved
/// within every group. Groups are ordered by their first command. A command
/// touching no account forms a group of its own.
pub fn partition_connected(commands: Vec<LedgerCommand>) -> Vec<Vec<LedgerCommand>> {
    let mut nodes: HashMap<AccountId, usize> = HashMap::new();
    for command in &commands {
        for account in command.accounts().into_iter().flatten() {
            let next = nodes.len();
            nodes.entry(account).or_insert(next);
        }
    }

    let mut components: UnionFind<usize> = UnionFind::new(nodes.len());
    for command in &commands {
        if let [Some(from), Some(to)] = command.accounts() {
            components.union(nodes[&from], nodes[&to]);
        }
    }

    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<LedgerCommand>> = Vec::new();
    for command in commands {
        let root = command.accounts()[0].map(|account| components.find_mut(nodes[&account]));
        match root {
            Some(root) => {
                let index = *group_of_root.entry(root).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[index].push(command);
            }
            None => groups.push(vec![command]),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn credit(account: AccountId, amount: i64) -> LedgerCommand {
        LedgerCommand::Credit {
            account,
            amount: Decimal::new(amount, 0),
        }
    }

    #[tokio::test]
    async fn test_run_empty_batch_returns_immediately() {
        let units: Vec<Box<dyn FnOnce() + Send>> = Vec::new();
        BatchRunner::new().run(units).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_waits_for_every_unit() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let units: Vec<_> = (1..=3)
            .map(|n| {
                let seen = Arc::clone(&seen);
                move || {
                    std::thread::sleep(std::time::Duration::from_millis(10 * n));
                    seen.lock().push(n);
                }
            })
            .collect();
        BatchRunner::new().run(units).await;

        let mut seen = seen.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_accepts_heterogeneous_units() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&counter);
        let second = Arc::clone(&counter);

        let units: Vec<Box<dyn FnOnce() + Send>> = vec![
            Box::new(move || {
                first.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move || {
                second.fetch_add(10, Ordering::SeqCst);
            }),
        ];
        BatchRunner::new().run(units).await;

        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_unit_does_not_stop_others() {
        let counter = Arc::new(AtomicUsize::new(0));

        let units: Vec<Box<dyn FnOnce() + Send>> = (0..4)
            .map(|n| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    if n == 2 {
                        panic!("unit failed");
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            })
            .collect();
        BatchRunner::new().run(units).await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    fn debit(account: AccountId, amount: i64) -> LedgerCommand {
        LedgerCommand::Debit {
            account,
            amount: Decimal::new(amount, 0),
        }
    }

    fn transfer(from: AccountId, to: AccountId, amount: i64) -> LedgerCommand {
        LedgerCommand::Transfer {
            from,
            to,
            amount: Decimal::new(amount, 0),
        }
    }

    #[test]
    fn test_partition_empty_batch() {
        assert!(partition_connected(Vec::new()).is_empty());
        assert!(plan_batch(Vec::new()).is_empty());
    }

    #[test]
    fn test_partition_keeps_unrelated_accounts_apart() {
        let batch = vec![credit(1, 10), credit(2, 20), debit(1, 5), credit(2, 1)];

        let groups = partition_connected(batch);

        assert_eq!(
            groups,
            vec![
                vec![credit(1, 10), debit(1, 5)],
                vec![credit(2, 20), credit(2, 1)],
            ]
        );
    }

    #[test]
    fn test_partition_joins_transfer_destination_with_later_commands() {
        let batch = vec![
            credit(1, 10),
            transfer(1, 2, 10),
            debit(2, 10),
            credit(3, 7),
        ];

        let groups = partition_connected(batch);

        assert_eq!(
            groups,
            vec![
                vec![credit(1, 10), transfer(1, 2, 10), debit(2, 10)],
                vec![credit(3, 7)],
            ]
        );
    }

    #[test]
    fn test_partition_merges_groups_linked_by_a_later_transfer() {
        let batch = vec![credit(1, 5), credit(2, 5), credit(3, 5), transfer(3, 1, 2)];

        let groups = partition_connected(batch);

        assert_eq!(
            groups,
            vec![
                vec![credit(1, 5), credit(3, 5), transfer(3, 1, 2)],
                vec![credit(2, 5)],
            ]
        );
    }

    #[test]
    fn test_plan_batch_splits_at_rollbacks() {
        let batch = vec![
            credit(1, 10),
            credit(2, 10),
            LedgerCommand::Rollback { tx: 1 },
            LedgerCommand::Rollback { tx: 2 },
            debit(1, 3),
        ];

        let stages = plan_batch(batch);

        assert_eq!(
            stages,
            vec![
                BatchStage::Concurrent(vec![vec![credit(1, 10)], vec![credit(2, 10)]]),
                BatchStage::Rollback(1),
                BatchStage::Rollback(2),
                BatchStage::Concurrent(vec![vec![debit(1, 3)]]),
            ]
        );
    }
}
