//! Concurrency properties of the ledger
//!
//! These tests drive `LedgerService` from many threads or pool workers at once
//! and check the properties that must hold regardless of interleaving:
//! - Balances never go negative
//! - Transfers conserve the total
//! - Transaction ids are dense and unique
//! - The total balance equals completed deposits minus completed withdrawals
//! - A transaction is rolled back at most once

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use ledger_engine::{
    BatchRunner, LedgerCommand, LedgerConfig, LedgerError, LedgerService, PoolConfig,
    TransactionStatus, TransactionType, WorkerPool,
};
use rust_decimal::Decimal;

fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

/// Completed deposits minus completed withdrawals
fn net_completed_flow(ledger: &LedgerService) -> Decimal {
    ledger
        .transactions()
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Completed)
        .fold(Decimal::ZERO, |total, tx| match tx.tx_type {
            TransactionType::Deposit => total + tx.amount,
            TransactionType::Withdraw => total - tx.amount,
            _ => total,
        })
}

#[test]
fn test_concurrent_mixed_operations_hold_invariants() {
    let ledger = LedgerService::default();
    for account in 0..4 {
        ledger.credit(account, dec(100)).unwrap();
    }

    let handles: Vec<_> = (0..8u64)
        .map(|worker| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for step in 0..200u64 {
                    let account = (worker + step) % 4;
                    let other = (account + 1 + step % 3) % 4;
                    let amount = dec(((worker * 7 + step) % 13 + 1) as i64);

                    let _ = match step % 4 {
                        0 => ledger.credit(account, amount),
                        1 => ledger.debit(account, amount),
                        2 => ledger.transfer(account, other, amount),
                        _ => ledger.rollback(worker * 200 + step),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let balances = ledger.balances();
    assert!(balances.iter().all(|balance| balance.amount >= Decimal::ZERO));
    assert_eq!(ledger.total_balance(), net_completed_flow(&ledger));

    let ids: Vec<u64> = ledger.transactions().iter().map(|tx| tx.id).collect();
    let expected: Vec<u64> = (1..=ids.len() as u64).collect();
    assert_eq!(ids, expected);

    assert!(ledger
        .transactions()
        .iter()
        .all(|tx| tx.status != TransactionStatus::Pending));
}

#[test]
fn test_concurrent_transfers_conserve_total() {
    let ledger = LedgerService::default();
    for account in 0..6 {
        ledger.credit(account, dec(1000)).unwrap();
    }
    let before = ledger.total_balance();

    let handles: Vec<_> = (0..6u64)
        .map(|worker| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for step in 0..300u64 {
                    let from = (worker + step) % 6;
                    let to = (from + 1 + step % 5) % 6;
                    let _ = ledger.transfer(from, to, dec(((step % 50) + 1) as i64));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ledger.total_balance(), before);
    assert!(ledger
        .balances()
        .iter()
        .all(|balance| balance.amount >= Decimal::ZERO));
}

#[test]
fn test_concurrent_rollbacks_apply_once() {
    let ledger = LedgerService::default();
    ledger.credit(1, dec(1000)).unwrap();
    let transfer = ledger.transfer(1, 2, dec(300)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.rollback(transfer.id))
        })
        .collect();

    let results: Vec<Result<_, LedgerError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        LedgerError::InvalidTransactionState { .. }
    )));
    assert_eq!(ledger.balance(1).amount, dec(1000));
    assert_eq!(ledger.balance(2).amount, Decimal::ZERO);
    assert_eq!(ledger.stats().reversed, 1);
    let rolled_back = ledger.transaction(transfer.id).unwrap();
    assert_eq!(rolled_back.status, TransactionStatus::Failed);
    assert!(rolled_back.rolled_back_at.is_some());
    assert_eq!(ledger.transactions().len(), 2);
}

#[test]
fn test_concurrent_debits_never_overdraw() {
    let ledger = LedgerService::default();
    ledger.credit(7, dec(50)).unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let ledger = ledger.clone();
            thread::spawn(move || (0..10).filter(|_| ledger.debit(7, dec(1)).is_ok()).count())
        })
        .collect();

    let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(succeeded, 50);
    assert_eq!(ledger.balance(7).amount, Decimal::ZERO);
    assert_eq!(ledger.stats().failed, 50);
}

#[test]
fn test_history_is_bounded_and_ordered_under_concurrency() {
    let ledger = LedgerService::in_memory(LedgerConfig { history_limit: 100 });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    ledger.credit(1, dec(1)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let history = ledger.history(1);
    assert_eq!(history.len(), 100);

    let versions: Vec<u64> = history.iter().map(|entry| entry.version).collect();
    assert_eq!(versions, (101..=200).collect::<Vec<_>>());
    assert_eq!(history.last().unwrap().amount, dec(200));

    let latest = ledger.balance_at(1, Utc::now()).unwrap();
    assert_eq!(latest.amount, dec(200));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_applies_every_job_exactly_once() {
    let ledger = LedgerService::default();
    let pool = WorkerPool::for_ledger(PoolConfig::new(3, 10), ledger.clone());

    for account in 0..10u64 {
        for _ in 0..100 {
            pool.enqueue(LedgerCommand::Credit {
                account,
                amount: dec(1),
            })
            .await
            .unwrap();
        }
    }
    pool.stop().await;

    assert_eq!(ledger.stats().completed, 1000);
    for account in 0..10u64 {
        assert_eq!(ledger.balance(account).amount, dec(100));
    }

    let ids: HashSet<u64> = ledger.transactions().iter().map(|tx| tx.id).collect();
    assert_eq!(ids, (1..=1000).collect::<HashSet<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_runner_units_share_one_ledger() {
    let ledger = LedgerService::default();

    let units: Vec<_> = (0..3u64)
        .map(|account| {
            let ledger = ledger.clone();
            move || {
                ledger.credit(account, dec(100)).unwrap();
                ledger.debit(account, dec(40)).unwrap();
            }
        })
        .collect();
    BatchRunner::new().run(units).await;

    for account in 0..3u64 {
        assert_eq!(ledger.balance(account).amount, dec(60));
    }
    assert_eq!(ledger.total_balance(), dec(180));
}

#[test]
fn test_ledger_is_shared_through_arc_and_clone() {
    let ledger = Arc::new(LedgerService::default());
    let clone = (*ledger).clone();

    clone.credit(1, dec(5)).unwrap();

    assert_eq!(ledger.balance(1).amount, dec(5));
}
