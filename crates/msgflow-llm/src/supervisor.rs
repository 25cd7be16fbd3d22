//! Per-tenant background loops
//!
//! Keeps at most one running task per tenant. Each task gets its own
//! cancellation token, a child of the supervisor's root token.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of per-tenant tasks
pub struct TenantSupervisor {
    name: &'static str,
    root: CancellationToken,
    running: Mutex<HashMap<i64, Running>>,
}

impl TenantSupervisor {
    /// Create a supervisor; `name` tags its log lines
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_parent(name, &CancellationToken::new())
    }

    /// Create a supervisor whose tasks also stop when `parent` is cancelled
    #[must_use]
    pub fn with_parent(name: &'static str, parent: &CancellationToken) -> Self {
        Self {
            name,
            root: parent.child_token(),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Start the tenant's task unless a live one is already registered.
    ///
    /// Tasks that ended on their own are pruned first, so a crashed loop can
    /// be started again. The check and the insert happen under one lock.
    /// Returns whether a task was started; nothing starts after shutdown.
    pub fn ensure<F, Fut>(&self, tenant_id: i64, start: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.root.is_cancelled() {
            return false;
        }
        let mut running = self.locked_live();
        if running.contains_key(&tenant_id) {
            return false;
        }

        let token = self.root.child_token();
        let handle = tokio::spawn(start(token.clone()));
        running.insert(tenant_id, Running { token, handle });
        info!(supervisor = self.name, tenant_id, "Started tenant loop");
        true
    }

    /// Cancel the tenant's task. Returns whether one was registered.
    pub fn stop(&self, tenant_id: i64) -> bool {
        let removed = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&tenant_id);
        match removed {
            Some(task) => {
                task.token.cancel();
                debug!(supervisor = self.name, tenant_id, "Stopped tenant loop");
                true
            }
            None => false,
        }
    }

    /// Whether the tenant has a live task
    #[must_use]
    pub fn is_running(&self, tenant_id: i64) -> bool {
        self.locked_live().contains_key(&tenant_id)
    }

    /// Tenants with a live task, ascending
    #[must_use]
    pub fn active_tenants(&self) -> Vec<i64> {
        let mut tenants: Vec<i64> = self
            .locked_live()
            .keys()
            .copied()
            .collect();
        tenants.sort_unstable();
        tenants
    }

    /// Lock the registry after dropping tasks that have already finished
    fn locked_live(&self) -> MutexGuard<'_, HashMap<i64, Running>> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.retain(|tenant_id, task| {
            let finished = task.handle.is_finished();
            if finished {
                debug!(supervisor = self.name, tenant_id, "Pruned finished tenant loop");
            }
            !finished
        });
        running
    }

    /// Cancel every task and wait for them to finish
    pub async fn shutdown(&self) {
        self.root.cancel();
        let drained: Vec<(i64, Running)> = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();

        for (tenant_id, task) in drained {
            task.token.cancel();
            if let Err(e) = task.handle.await {
                warn!(supervisor = self.name, tenant_id, error = %e, "Tenant loop ended abnormally");
            }
        }
        info!(supervisor = self.name, "All tenant loops stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_loop(
        started: Arc<AtomicUsize>,
    ) -> impl FnOnce(CancellationToken) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> {
        move |token| {
            Box::pin(async move {
                started.fetch_add(1, Ordering::SeqCst);
                token.cancelled().await;
            })
        }
    }

    #[tokio::test]
    async fn test_ensure_twice_starts_one_loop() {
        let supervisor = TenantSupervisor::new("test");
        let started = Arc::new(AtomicUsize::new(0));

        assert!(supervisor.ensure(1, counting_loop(started.clone())));
        assert!(!supervisor.ensure(1, counting_loop(started.clone())));
        assert_eq!(supervisor.active_tenants(), vec![1]);

        supervisor.shutdown().await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_starts_one_loop() {
        let supervisor = Arc::new(TenantSupervisor::new("test"));
        let started = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let supervisor = supervisor.clone();
                let started = started.clone();
                tokio::spawn(async move { supervisor.ensure(5, counting_loop(started)) })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        supervisor.shutdown().await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_allows_restart() {
        let supervisor = TenantSupervisor::new("test");
        let started = Arc::new(AtomicUsize::new(0));

        supervisor.ensure(2, counting_loop(started.clone()));
        assert!(supervisor.stop(2));
        assert!(!supervisor.stop(2));
        assert!(!supervisor.is_running(2));

        assert!(supervisor.ensure(2, counting_loop(started.clone())));
        supervisor.shutdown().await;
        assert!(supervisor.active_tenants().is_empty());
    }

    #[tokio::test]
    async fn test_exited_loop_can_be_started_again() {
        let supervisor = TenantSupervisor::new("test");
        let started = Arc::new(AtomicUsize::new(0));

        let counter = started.clone();
        assert!(supervisor.ensure(4, move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        for _ in 0..100 {
            if !supervisor.is_running(4) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!supervisor.is_running(4));
        assert!(supervisor.active_tenants().is_empty());

        assert!(supervisor.ensure(4, counting_loop(started.clone())));
        assert_eq!(supervisor.active_tenants(), vec![4]);
        supervisor.shutdown().await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_nothing_starts_after_shutdown() {
        let supervisor = TenantSupervisor::new("test");
        supervisor.shutdown().await;

        let started = Arc::new(AtomicUsize::new(0));
        assert!(!supervisor.ensure(1, counting_loop(started.clone())));
        assert!(supervisor.active_tenants().is_empty());
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_loops() {
        let parent = CancellationToken::new();
        let supervisor = TenantSupervisor::with_parent("test", &parent);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        supervisor.ensure(3, move |token| async move {
            token.cancelled().await;
            let _ = tx.send(());
        });

        parent.cancel();
        rx.await.unwrap();
    }
}
