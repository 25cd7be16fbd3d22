use async_trait::async_trait;
use chrono::Utc;
use msgflow_llm::{HealthCheckResult, HealthStatus, HealthStore};
use tracing::debug;

use super::SqlStore;

/// Probes inspected when deciding whether a provider is unhealthy
const FAILURE_WINDOW: i64 = 3;

#[async_trait]
impl HealthStore for SqlStore {
    async fn list_active_provider_ids(&self, tenant_id: i64) -> msgflow_llm::Result<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM llm_providers WHERE tenant_id = ? AND is_active = TRUE ORDER BY id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::Error::from)?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Append the probe and overwrite the provider's summary status
    async fn insert_health(
        &self,
        tenant_id: i64,
        provider_id: i64,
        result: HealthCheckResult,
    ) -> msgflow_llm::Result<()> {
        let mut tx = self.pool.begin().await.map_err(crate::Error::from)?;
        sqlx::query(
            r#"
            INSERT INTO llm_provider_health (
                provider_id, tenant_id, check_time, status, latency_ms, estimated_cost, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(provider_id)
        .bind(tenant_id)
        .bind(result.timestamp)
        .bind(result.status.as_str())
        .bind(i64::try_from(result.latency_ms).unwrap_or(i64::MAX))
        .bind(result.estimated_cost)
        .bind(&result.error_message)
        .execute(&mut *tx)
        .await
        .map_err(crate::Error::from)?;

        sqlx::query(
            "UPDATE llm_providers SET health_status = ?, last_health_check = ? \
             WHERE id = ? AND tenant_id = ?",
        )
        .bind(result.status.as_str())
        .bind(result.timestamp)
        .bind(provider_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(crate::Error::from)?;

        tx.commit().await.map_err(crate::Error::from)?;
        debug!(tenant_id, provider_id, status = %result.status, "Recorded health probe");
        Ok(())
    }

    async fn recent_health_failures(
        &self,
        tenant_id: i64,
        provider_id: i64,
    ) -> msgflow_llm::Result<usize> {
        let statuses: Vec<(String,)> = sqlx::query_as(
            "SELECT status FROM llm_provider_health \
             WHERE provider_id = ? AND tenant_id = ? \
             ORDER BY check_time DESC, id DESC LIMIT ?",
        )
        .bind(provider_id)
        .bind(tenant_id)
        .bind(FAILURE_WINDOW)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::Error::from)?;

        Ok(statuses
            .iter()
            .filter(|(status,)| status != HealthStatus::Ok.as_str())
            .count())
    }

    async fn set_provider_health(
        &self,
        tenant_id: i64,
        provider_id: i64,
        status: HealthStatus,
    ) -> msgflow_llm::Result<()> {
        sqlx::query(
            "UPDATE llm_providers SET health_status = ?, last_health_check = ? \
             WHERE id = ? AND tenant_id = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(provider_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(crate::Error::from)?;
        Ok(())
    }
}

impl SqlStore {
    /// Tenants owning at least one active provider, ascending.
    ///
    /// Used at startup to resume per-tenant loops.
    pub async fn tenants_with_active_providers(&self) -> crate::Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT tenant_id FROM llm_providers WHERE is_active = TRUE ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(tenant_id,)| tenant_id).collect())
    }
}
