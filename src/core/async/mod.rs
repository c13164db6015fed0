//! Concurrent execution primitives
//!
//! - **WorkerPool**: fixed set of tokio workers draining a bounded job queue
//! - **BatchRunner**: runs a set of independent units and joins them
//!
//! Both sit on top of `LedgerService`, which is already safe to share across
//! threads; these types only decide where and when commands run.

pub mod batch_runner;
pub mod worker_pool;

pub use batch_runner::{partition_connected, plan_batch, BatchRunner, BatchStage};
pub use worker_pool::{PoolConfig, TransactionJob, WorkerPool, DEFAULT_QUEUE_CAPACITY};
