//! msgflow Core - storage, queueing and background work
//!
//! This crate provides the stateful side of msgflow:
//! - Store: SQLite persistence for providers, usage, health and analyses
//! - Queue: per-tenant Redis lists of analysis jobs
//! - Worker: per-tenant loops that drain the queue
//! - Event bus: broadcast of finished analyses
//! - Shutdown: coordinated cancellation and draining

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event_bus;
pub mod queue;
pub mod shutdown;
pub mod store;
pub mod worker;

pub use error::{Error, Result};
pub use event_bus::{AnalysisEvent, EventBus};
pub use queue::{AnalysisQueue, MemoryQueue, QueueMessage, RedisQueue, QUEUE_KEY_PREFIX};
pub use shutdown::{wait_for_shutdown_signal, ShutdownController, ShutdownPhase, TaskGuard};
pub use store::{
    budget_alert, success_rate, AnalysisStore, CostBucket, CostReport, DailyCost,
    ImportantMessage, ProviderComparison, ProviderHealthSummary, ProviderHistoryEntry,
    ProviderInput, ProviderRecord, SqlStore, MASKED_API_KEY,
};
pub use worker::{AnalysisWorker, WorkerConfig, WorkerScheduler};
