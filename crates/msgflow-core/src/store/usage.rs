use async_trait::async_trait;
use chrono::Utc;
use msgflow_llm::{UsageRecord, UsageStore};

use super::SqlStore;

fn millis(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl UsageStore for SqlStore {
    async fn insert_usage(
        &self,
        tenant_id: i64,
        provider_id: i64,
        message_id: Option<i64>,
        record: UsageRecord,
        cost_in: f64,
        cost_out: f64,
    ) -> msgflow_llm::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO llm_usage_logs (
                tenant_id, provider_id, message_id, input_tokens, output_tokens, total_tokens,
                input_cost, output_cost, total_cost, response_time_ms, success, error_message,
                feature_used, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tenant_id)
        .bind(provider_id)
        .bind(message_id)
        .bind(i64::from(record.input_tokens))
        .bind(i64::from(record.output_tokens))
        .bind(i64::from(record.total_tokens))
        .bind(record.input_cost(cost_in))
        .bind(record.output_cost(cost_out))
        .bind(record.total_cost(cost_in, cost_out))
        .bind(millis(record.latency))
        .bind(record.success)
        .bind(&record.error_message)
        .bind(record.feature.map(|f| f.as_str()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(crate::Error::from)?;
        Ok(())
    }
}
