//! Health scheduler
//!
//! Runs at most one [`HealthMonitor`] loop per tenant.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::monitor::HealthMonitor;
use crate::supervisor::TenantSupervisor;

/// Per-tenant health loops
pub struct HealthScheduler {
    monitor: Arc<HealthMonitor>,
    supervisor: TenantSupervisor,
}

impl HealthScheduler {
    /// Create a scheduler
    #[must_use]
    pub fn new(monitor: Arc<HealthMonitor>) -> Self {
        Self {
            monitor,
            supervisor: TenantSupervisor::new("health"),
        }
    }

    /// Create a scheduler whose loops stop when `shutdown` is cancelled
    #[must_use]
    pub fn with_shutdown(monitor: Arc<HealthMonitor>, shutdown: &CancellationToken) -> Self {
        Self {
            monitor,
            supervisor: TenantSupervisor::with_parent("health", shutdown),
        }
    }

    /// Start the tenant's loop unless it is running. Returns whether it started.
    pub fn ensure_tenant(&self, tenant_id: i64) -> bool {
        let monitor = Arc::clone(&self.monitor);
        self.supervisor.ensure(tenant_id, move |token| async move {
            monitor.run(tenant_id, token).await;
        })
    }

    /// Stop the tenant's loop. Returns whether one was running.
    pub fn stop_tenant(&self, tenant_id: i64) -> bool {
        self.supervisor.stop(tenant_id)
    }

    /// Tenants with a running loop
    #[must_use]
    pub fn active_tenants(&self) -> Vec<i64> {
        self.supervisor.active_tenants()
    }

    /// Stop every loop and wait for them
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }
}
