//! Worker scheduler
//!
//! Runs at most one [`AnalysisWorker`] loop per tenant.

use msgflow_llm::TenantSupervisor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::analysis::AnalysisWorker;

/// Per-tenant worker loops
pub struct WorkerScheduler {
    worker: Arc<AnalysisWorker>,
    supervisor: TenantSupervisor,
}

impl WorkerScheduler {
    /// Create a scheduler
    #[must_use]
    pub fn new(worker: Arc<AnalysisWorker>) -> Self {
        Self {
            worker,
            supervisor: TenantSupervisor::new("analysis"),
        }
    }

    /// Create a scheduler whose loops stop when `shutdown` is cancelled
    #[must_use]
    pub fn with_shutdown(worker: Arc<AnalysisWorker>, shutdown: &CancellationToken) -> Self {
        Self {
            worker,
            supervisor: TenantSupervisor::with_parent("analysis", shutdown),
        }
    }

    /// Start the tenant's worker unless it is running. Returns whether it started.
    pub fn ensure_tenant(&self, tenant_id: i64) -> bool {
        let worker = Arc::clone(&self.worker);
        self.supervisor.ensure(tenant_id, move |token| async move {
            worker.run(tenant_id, token).await;
        })
    }

    /// Stop the tenant's worker. Returns whether one was running.
    pub fn stop_tenant(&self, tenant_id: i64) -> bool {
        self.supervisor.stop(tenant_id)
    }

    /// Tenants with a running worker
    #[must_use]
    pub fn active_tenants(&self) -> Vec<i64> {
        self.supervisor.active_tenants()
    }

    /// Stop every worker and wait for them
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }
}
