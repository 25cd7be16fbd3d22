//! Health monitor
//!
//! Probes every active provider of a tenant, records each probe and
//! demotes providers that keep failing to `unhealthy`.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::router::LlmRouter;
use crate::store::HealthStore;
use crate::types::{HealthCheckResult, HealthStatus};

/// Default pause between passes
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(300);

/// Default latency above which a successful probe counts as slow
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(3);

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    /// Pause between passes
    pub interval: Duration,
    /// Latency above which a probe is `slow`
    pub slow_threshold: Duration,
    /// Non-ok probes among the most recent ones that mark a provider unhealthy
    pub failure_threshold: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEALTH_INTERVAL,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            failure_threshold: 3,
        }
    }
}

impl HealthConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pause between passes
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the slow threshold
    #[must_use]
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

/// Probe loop over a tenant's providers
pub struct HealthMonitor {
    router: Arc<LlmRouter>,
    store: Arc<dyn HealthStore>,
    config: HealthConfig,
}

impl HealthMonitor {
    /// Create a monitor
    #[must_use]
    pub fn new(router: Arc<LlmRouter>, store: Arc<dyn HealthStore>, config: HealthConfig) -> Self {
        Self {
            router,
            store,
            config,
        }
    }

    /// Monitor settings
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// One immediate pass, then one per interval until cancelled
    pub async fn run(&self, tenant_id: i64, shutdown: CancellationToken) {
        info!(tenant_id, "Health monitor starting");
        self.run_once(tenant_id).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    self.run_once(tenant_id).await;
                }
                _ = shutdown.cancelled() => {
                    info!(tenant_id, "Health monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Probe every active provider once.
    ///
    /// Returns the status stored for each probed provider. Providers that
    /// cannot be resolved are skipped.
    #[instrument(skip(self))]
    pub async fn run_once(&self, tenant_id: i64) -> Vec<(i64, HealthStatus)> {
        let provider_ids = match self.store.list_active_provider_ids(tenant_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(tenant_id, error = %e, "Failed to list providers for health check");
                return Vec::new();
            }
        };

        let mut statuses = Vec::with_capacity(provider_ids.len());
        for provider_id in provider_ids {
            let provider = match self.router.get_provider(tenant_id, provider_id).await {
                Ok(provider) => provider,
                Err(e) => {
                    debug!(tenant_id, provider_id, error = %e, "Skipping unresolvable provider");
                    continue;
                }
            };

            let result = self.classify(provider.health_check().await);
            let status = self.persist(tenant_id, provider_id, result).await;
            statuses.push((provider_id, status));
        }
        statuses
    }

    fn classify(&self, probe: crate::Result<HealthCheckResult>) -> HealthCheckResult {
        match probe {
            Err(e) => HealthCheckResult::failed(Duration::ZERO, e.to_string()),
            Ok(mut result) => {
                result.status = match result.status {
                    HealthStatus::Ok | HealthStatus::Slow
                        if result.latency() > self.config.slow_threshold =>
                    {
                        HealthStatus::Slow
                    }
                    HealthStatus::Ok | HealthStatus::Slow => HealthStatus::Ok,
                    _ => HealthStatus::Error,
                };
                result
            }
        }
    }

    async fn persist(
        &self,
        tenant_id: i64,
        provider_id: i64,
        result: HealthCheckResult,
    ) -> HealthStatus {
        let mut status = result.status;
        if let Err(e) = self.store.insert_health(tenant_id, provider_id, result).await {
            warn!(tenant_id, provider_id, error = %e, "Failed to record health probe");
        }
        if status != HealthStatus::Error {
            return status;
        }

        match self.store.recent_health_failures(tenant_id, provider_id).await {
            Ok(failures) if failures >= self.config.failure_threshold => {
                warn!(tenant_id, provider_id, failures, "Provider marked unhealthy");
                match self
                    .store
                    .set_provider_health(tenant_id, provider_id, HealthStatus::Unhealthy)
                    .await
                {
                    Ok(()) => status = HealthStatus::Unhealthy,
                    Err(e) => {
                        warn!(tenant_id, provider_id, error = %e, "Failed to mark provider unhealthy");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(tenant_id, provider_id, error = %e, "Failed to read recent health probes");
            }
        }
        status
    }
}
