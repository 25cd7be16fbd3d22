//! Storage seams
//!
//! The routing, service and health layers only talk to storage through
//! these traits. Implementations map their own failures to
//! [`Error::Store`](crate::Error::Store).

use crate::cost::UsageRecord;
use crate::error::Result;
use crate::types::{HealthCheckResult, HealthStatus, ProviderConfig};

/// Source of decrypted provider configurations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProviderStore: Send + Sync {
    /// Active providers of a tenant, default first then ascending id
    async fn list_providers(&self, tenant_id: i64) -> Result<Vec<ProviderConfig>>;

    /// The tenant's active default provider
    async fn get_default_provider(&self, tenant_id: i64) -> Result<Option<ProviderConfig>>;

    /// One active provider of a tenant
    async fn get_provider_by_id(
        &self,
        tenant_id: i64,
        provider_id: i64,
    ) -> Result<Option<ProviderConfig>>;
}

/// Sink for per-call usage rows
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UsageStore: Send + Sync {
    /// Persist one usage row with costs derived at the given prices
    async fn insert_usage(
        &self,
        tenant_id: i64,
        provider_id: i64,
        message_id: Option<i64>,
        record: UsageRecord,
        cost_per_1k_input: f64,
        cost_per_1k_output: f64,
    ) -> Result<()>;
}

/// Probe history and provider health status
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HealthStore: Send + Sync {
    /// IDs of the tenant's active providers
    async fn list_active_provider_ids(&self, tenant_id: i64) -> Result<Vec<i64>>;

    /// Append a probe and overwrite the provider's status with its outcome
    async fn insert_health(
        &self,
        tenant_id: i64,
        provider_id: i64,
        result: HealthCheckResult,
    ) -> Result<()>;

    /// Non-ok probes among the provider's 3 most recent
    async fn recent_health_failures(&self, tenant_id: i64, provider_id: i64) -> Result<usize>;

    /// Overwrite the provider's status
    async fn set_provider_health(
        &self,
        tenant_id: i64,
        provider_id: i64,
        status: HealthStatus,
    ) -> Result<()>;
}
