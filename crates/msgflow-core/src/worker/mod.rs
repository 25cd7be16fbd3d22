//! Analysis workers
//!
//! One worker loop per tenant drains the tenant's queue in batches, runs
//! each job through the fallback analysis path and persists the result.
//!
//! # Module Structure
//!
//! - `analysis`: the worker loop and per-job processing
//! - `scheduler`: one loop per tenant

mod analysis;
mod scheduler;


pub use analysis::{
    AnalysisWorker, WorkerConfig, DEFAULT_BATCH_SIZE, DEFAULT_ERROR_BACKOFF,
    DEFAULT_IDLE_INTERVAL, DEFAULT_JOB_TIMEOUT,
};
pub use scheduler::WorkerScheduler;
