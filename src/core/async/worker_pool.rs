//! Fixed-size worker pool draining a bounded queue of transaction jobs
//!
//! This module provides `WorkerPool`, the asynchronous entry point into the
//! ledger. Callers enqueue `TransactionJob`s; a fixed number of tokio tasks
//! pull them off a bounded channel and hand each one to a caller-supplied
//! processing function, run on tokio's blocking pool.
//!
//! # Architecture
//!
//! ```text
//! enqueue ──► mpsc::channel(queue_capacity) ──► worker 0 ┐
//!                                            ├─► worker 1 ├─► process(job)
//!                                            └─► worker N ┘
//! ```
//!
//! # Guarantees
//!
//! - `enqueue` waits while the queue is full
//! - `stop` closes the queue, lets workers drain what is already queued and
//!   returns once every worker has exited
//! - A job that fails or panics is contained to that job; the worker moves on
//!   to the next one
//! - No retries and no dead-lettering

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::traits::{BalanceStore, TransactionLog};
use crate::core::LedgerService;
use crate::types::{LedgerCommand, LedgerError};

/// Default number of jobs that may wait in the queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Configuration for the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Maximum number of queued jobs before `enqueue` waits
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Create a new PoolConfig, replacing zero values with defaults
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let default = Self::default();

        let workers = if workers == 0 {
            warn!(
                workers,
                default = default.workers,
                "invalid worker count, using default"
            );
            default.workers
        } else {
            workers
        };

        let queue_capacity = if queue_capacity == 0 {
            warn!(
                queue_capacity,
                default = default.queue_capacity,
                "invalid queue capacity, using default"
            );
            default.queue_capacity
        } else {
            queue_capacity
        };

        Self {
            workers,
            queue_capacity,
        }
    }
}

/// A unit of work queued on the pool
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionJob {
    pub command: LedgerCommand,
}

impl From<LedgerCommand> for TransactionJob {
    fn from(command: LedgerCommand) -> Self {
        Self { command }
    }
}

type JobQueue = Arc<Mutex<mpsc::Receiver<TransactionJob>>>;

/// Bounded pool of tokio workers applying transaction jobs
#[derive(Debug)]
pub struct WorkerPool {
    sender: mpsc::Sender<TransactionJob>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.workers` workers, each applying jobs with `process`
    ///
    /// Must be called from within a tokio runtime. `process` is responsible
    /// for handling (typically logging) the outcome of each job.
    pub fn start<F>(config: PoolConfig, process: F) -> Self
    where
        F: Fn(TransactionJob) + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let queue: JobQueue = Arc::new(Mutex::new(receiver));
        let process = Arc::new(process);

        let workers = (0..config.workers)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let process = Arc::clone(&process);
                tokio::spawn(run_worker(worker_id, queue, process))
            })
            .collect();

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Self { sender, workers }
    }

    /// Start a pool whose workers apply each job through `ledger`
    ///
    /// Failed commands are logged and otherwise dropped.
    pub fn for_ledger<B, L>(config: PoolConfig, ledger: LedgerService<B, L>) -> Self
    where
        B: BalanceStore + 'static,
        L: TransactionLog + 'static,
    {
        Self::start(config, move |job: TransactionJob| {
            if let Err(error) = ledger.apply(job.command.clone()) {
                warn!(command = ?job.command, %error, "job failed");
            }
        })
    }

    /// Queue a job, waiting while the queue is full
    pub async fn enqueue(&self, job: impl Into<TransactionJob>) -> Result<(), LedgerError> {
        self.sender
            .send(job.into())
            .await
            .map_err(|_| LedgerError::PoolClosed)
    }

    /// Number of workers in the pool
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for every worker to drain it and exit
    pub async fn stop(self) {
        let WorkerPool { sender, workers } = self;
        drop(sender);

        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task failed");
            }
        }

        info!("worker pool stopped");
    }
}

async fn run_worker<F>(worker_id: usize, queue: JobQueue, process: Arc<F>)
where
    F: Fn(TransactionJob) + Send + Sync + 'static,
{
    loop {
        let job = {
            let mut receiver = queue.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        debug!(worker_id, command = ?job.command, "processing job");
        let process = Arc::clone(&process);
        if let Err(e) = tokio::task::spawn_blocking(move || process(job)).await {
            error!(worker_id, error = %e, "job panicked, continuing with next job");
        }
    }

    debug!(worker_id, "worker exiting");
}
