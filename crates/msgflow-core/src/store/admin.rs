//! Provider administration
//!
//! Every write runs in one transaction together with its history row. A
//! write that sets `is_default` clears the flag on the tenant's other
//! providers inside the same transaction.

use chrono::Utc;
use msgflow_llm::{vendor_defaults, DEFAULT_MAX_REQUESTS_PER_DAY};
use serde_json::json;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument};

use super::providers::PROVIDER_COLUMNS;
use super::types::{HistoryRow, ProviderHistoryEntry, ProviderInput, ProviderRecord, ProviderRow};
use super::SqlStore;
use crate::error::{Error, Result};

/// History entries returned per provider
const HISTORY_LIMIT: i64 = 5;

fn not_found(provider_id: i64) -> Error {
    Error::NotFound(format!("provider {provider_id}"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl SqlStore {
    /// Create a provider, filling omitted fields with vendor defaults
    #[instrument(skip(self, input), fields(provider = ?input.provider_name))]
    pub async fn create_provider(
        &self,
        tenant_id: i64,
        input: ProviderInput,
        changed_by: Option<&str>,
    ) -> Result<ProviderRecord> {
        let (Some(vendor), Some(api_key)) = (
            non_empty(input.provider_name.as_deref()),
            non_empty(input.api_key.as_deref()),
        ) else {
            return Err(Error::Validation(
                "provider_name and api_key are required".to_string(),
            ));
        };
        let defaults = vendor_defaults(vendor)
            .ok_or_else(|| Error::Validation(format!("unsupported provider: {vendor}")))?;
        let vendor = vendor.to_lowercase();
        let encrypted = self.encrypt_key(api_key)?;

        let model = input
            .model_name
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| defaults.model_name.to_string());
        let api_version = input
            .azure_api_version
            .clone()
            .or_else(|| defaults.azure_api_version.map(str::to_string));
        let is_default = input.is_default.unwrap_or(false);

        let mut tx = self.pool.begin().await?;
        if is_default {
            clear_default(&mut tx, tenant_id).await?;
        }

        let (provider_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO llm_providers (
                tenant_id, provider_name, api_key, model_name, display_name, base_url,
                azure_endpoint, azure_deployment, azure_api_version, temperature, max_tokens,
                cost_per_1k_input, cost_per_1k_output, max_requests_per_minute,
                max_requests_per_day, monthly_budget, is_active, is_default, is_fallback,
                health_status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'unknown', ?)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(&vendor)
        .bind(&encrypted)
        .bind(&model)
        .bind(&input.display_name)
        .bind(&input.base_url)
        .bind(&input.azure_endpoint)
        .bind(&input.azure_deployment)
        .bind(&api_version)
        .bind(f64::from(input.temperature.unwrap_or(defaults.temperature)))
        .bind(i64::from(input.max_tokens.unwrap_or(defaults.max_tokens)))
        .bind(input.cost_per_1k_input.unwrap_or(defaults.cost_per_1k_input))
        .bind(input.cost_per_1k_output.unwrap_or(defaults.cost_per_1k_output))
        .bind(i64::from(
            input
                .max_requests_per_minute
                .unwrap_or(defaults.max_requests_per_minute),
        ))
        .bind(i64::from(
            input
                .max_requests_per_day
                .unwrap_or(DEFAULT_MAX_REQUESTS_PER_DAY),
        ))
        .bind(input.monthly_budget)
        .bind(input.is_active.unwrap_or(true))
        .bind(is_default)
        .bind(input.is_fallback.unwrap_or(false))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let record = fetch_record(&mut tx, tenant_id, provider_id).await?;
        let change = json!({
            "event": "created",
            "provider_id": provider_id,
            "config": serde_json::to_value(&record)?,
        });
        write_history(&mut tx, tenant_id, provider_id, &change, changed_by).await?;
        tx.commit().await?;

        info!(tenant_id, provider_id, provider = %vendor, "Created LLM provider");
        Ok(record)
    }

    /// Partially update a provider; omitted fields keep their value
    #[instrument(skip(self, input))]
    pub async fn update_provider(
        &self,
        tenant_id: i64,
        provider_id: i64,
        input: ProviderInput,
        changed_by: Option<&str>,
    ) -> Result<ProviderRecord> {
        let vendor = match non_empty(input.provider_name.as_deref()) {
            Some(vendor) if vendor_defaults(vendor).is_none() => {
                return Err(Error::Validation(format!("unsupported provider: {vendor}")));
            }
            Some(vendor) => Some(vendor.to_lowercase()),
            None => None,
        };
        let encrypted = non_empty(input.api_key.as_deref())
            .map(|key| self.encrypt_key(key))
            .transpose()?;
        let model = non_empty(input.model_name.as_deref()).map(str::to_string);

        let mut tx = self.pool.begin().await?;
        if input.is_default == Some(true) {
            clear_default(&mut tx, tenant_id).await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE llm_providers SET
                provider_name = COALESCE(?, provider_name),
                api_key = COALESCE(?, api_key),
                model_name = COALESCE(?, model_name),
                display_name = COALESCE(?, display_name),
                base_url = COALESCE(?, base_url),
                azure_endpoint = COALESCE(?, azure_endpoint),
                azure_deployment = COALESCE(?, azure_deployment),
                azure_api_version = COALESCE(?, azure_api_version),
                temperature = COALESCE(?, temperature),
                max_tokens = COALESCE(?, max_tokens),
                cost_per_1k_input = COALESCE(?, cost_per_1k_input),
                cost_per_1k_output = COALESCE(?, cost_per_1k_output),
                max_requests_per_minute = COALESCE(?, max_requests_per_minute),
                max_requests_per_day = COALESCE(?, max_requests_per_day),
                monthly_budget = COALESCE(?, monthly_budget),
                is_active = COALESCE(?, is_active),
                is_default = COALESCE(?, is_default),
                is_fallback = COALESCE(?, is_fallback)
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(&vendor)
        .bind(&encrypted)
        .bind(&model)
        .bind(&input.display_name)
        .bind(&input.base_url)
        .bind(&input.azure_endpoint)
        .bind(&input.azure_deployment)
        .bind(&input.azure_api_version)
        .bind(input.temperature.map(f64::from))
        .bind(input.max_tokens.map(i64::from))
        .bind(input.cost_per_1k_input)
        .bind(input.cost_per_1k_output)
        .bind(input.max_requests_per_minute.map(i64::from))
        .bind(input.max_requests_per_day.map(i64::from))
        .bind(input.monthly_budget)
        .bind(input.is_active)
        .bind(input.is_default)
        .bind(input.is_fallback)
        .bind(tenant_id)
        .bind(provider_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(not_found(provider_id));
        }

        let mut changes = serde_json::to_value(&input)?;
        if let Some(fields) = changes.as_object_mut() {
            fields.retain(|_, v| !v.is_null());
            if encrypted.is_some() {
                fields.insert("api_key".to_string(), json!("rotated"));
            }
        }
        let change = json!({
            "event": "updated",
            "provider_id": provider_id,
            "changes": changes,
        });
        write_history(&mut tx, tenant_id, provider_id, &change, changed_by).await?;
        let record = fetch_record(&mut tx, tenant_id, provider_id).await?;
        tx.commit().await?;

        info!(tenant_id, provider_id, "Updated LLM provider");
        Ok(record)
    }

    /// Delete a provider. The change history is kept.
    #[instrument(skip(self))]
    pub async fn delete_provider(
        &self,
        tenant_id: i64,
        provider_id: i64,
        changed_by: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM llm_providers WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id)
            .bind(provider_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(not_found(provider_id));
        }

        let change = json!({ "event": "deleted", "provider_id": provider_id });
        write_history(&mut tx, tenant_id, provider_id, &change, changed_by).await?;
        tx.commit().await?;

        info!(tenant_id, provider_id, "Deleted LLM provider");
        Ok(())
    }

    /// Every provider of a tenant, newest first, keys masked
    pub async fn list_provider_records(&self, tenant_id: i64) -> Result<Vec<ProviderRecord>> {
        let rows: Vec<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM llm_providers WHERE tenant_id = ? ORDER BY id DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ProviderRow::into_record).collect())
    }

    /// One provider, key masked
    pub async fn get_provider_record(
        &self,
        tenant_id: i64,
        provider_id: i64,
    ) -> Result<ProviderRecord> {
        let row: Option<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM llm_providers WHERE tenant_id = ? AND id = ?"
        ))
        .bind(tenant_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProviderRow::into_record)
            .ok_or_else(|| not_found(provider_id))
    }

    /// Latest changes of a provider, newest first
    pub async fn provider_history(
        &self,
        tenant_id: i64,
        provider_id: i64,
    ) -> Result<Vec<ProviderHistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT id, provider_id, change_json, changed_by, created_at \
             FROM llm_provider_history WHERE tenant_id = ? AND provider_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(tenant_id)
        .bind(provider_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ProviderHistoryEntry::from).collect())
    }
}

async fn clear_default(tx: &mut Transaction<'_, Sqlite>, tenant_id: i64) -> Result<()> {
    sqlx::query("UPDATE llm_providers SET is_default = FALSE WHERE tenant_id = ?")
        .bind(tenant_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn fetch_record(
    tx: &mut Transaction<'_, Sqlite>,
    tenant_id: i64,
    provider_id: i64,
) -> Result<ProviderRecord> {
    let row: Option<ProviderRow> = sqlx::query_as(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM llm_providers WHERE tenant_id = ? AND id = ?"
    ))
    .bind(tenant_id)
    .bind(provider_id)
    .fetch_optional(&mut **tx)
    .await?;
    row.map(ProviderRow::into_record)
        .ok_or_else(|| not_found(provider_id))
}

async fn write_history(
    tx: &mut Transaction<'_, Sqlite>,
    tenant_id: i64,
    provider_id: i64,
    change: &serde_json::Value,
    changed_by: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO llm_provider_history (tenant_id, provider_id, change_json, changed_by, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(tenant_id)
    .bind(provider_id)
    .bind(change.to_string())
    .bind(changed_by)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
