//! Decrypted provider configs for the router

use async_trait::async_trait;
use msgflow_llm::{ProviderConfig, ProviderStore};
use tracing::instrument;

use super::types::ProviderRow;
use super::SqlStore;

pub(super) const PROVIDER_COLUMNS: &str = "id, tenant_id, provider_name, api_key, model_name, \
    display_name, base_url, azure_endpoint, azure_deployment, azure_api_version, temperature, \
    max_tokens, cost_per_1k_input, cost_per_1k_output, max_requests_per_minute, \
    max_requests_per_day, monthly_budget, is_active, is_default, is_fallback, health_status, \
    last_health_check, created_at";

impl SqlStore {
    fn decrypted(&self, mut row: ProviderRow) -> ProviderConfig {
        let stored = std::mem::take(&mut row.api_key);
        row.api_key = self.decrypt_key(row.id, stored);
        row.into_config()
    }
}

#[async_trait]
impl ProviderStore for SqlStore {
    #[instrument(skip(self))]
    async fn list_providers(&self, tenant_id: i64) -> msgflow_llm::Result<Vec<ProviderConfig>> {
        let rows: Vec<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM llm_providers \
             WHERE tenant_id = ? AND is_active = TRUE \
             ORDER BY is_default DESC, id ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::Error::from)?;

        Ok(rows.into_iter().map(|row| self.decrypted(row)).collect())
    }

    async fn get_default_provider(
        &self,
        tenant_id: i64,
    ) -> msgflow_llm::Result<Option<ProviderConfig>> {
        let row: Option<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM llm_providers \
             WHERE tenant_id = ? AND is_default = TRUE AND is_active = TRUE LIMIT 1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::Error::from)?;

        Ok(row.map(|row| self.decrypted(row)))
    }

    async fn get_provider_by_id(
        &self,
        tenant_id: i64,
        provider_id: i64,
    ) -> msgflow_llm::Result<Option<ProviderConfig>> {
        let row: Option<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM llm_providers \
             WHERE tenant_id = ? AND id = ? AND is_active = TRUE"
        ))
        .bind(tenant_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::Error::from)?;

        Ok(row.map(|row| self.decrypted(row)))
    }
}
