//! Analysis persistence

use async_trait::async_trait;
use chrono::Utc;
use msgflow_llm::AnalysisResult;
use tracing::debug;

use super::types::ImportantMessage;
use super::SqlStore;
use crate::error::Result;

/// Where analysis results are kept
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Save (or replace) a message's analysis; important messages are also
    /// flagged once
    async fn store_analysis(
        &self,
        tenant_id: i64,
        message_id: i64,
        result: &AnalysisResult,
    ) -> Result<()>;
}

#[async_trait]
impl AnalysisStore for SqlStore {
    async fn store_analysis(
        &self,
        tenant_id: i64,
        message_id: i64,
        result: &AnalysisResult,
    ) -> Result<()> {
        let payload = serde_json::to_string(result)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO message_analysis (tenant_id, message_id, analysis_json, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (tenant_id, message_id)
            DO UPDATE SET analysis_json = excluded.analysis_json, updated_at = excluded.updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(message_id)
        .bind(&payload)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.is_important {
            sqlx::query(
                r#"
                INSERT INTO important_messages (tenant_id, message_id, priority, reason, created_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(tenant_id)
            .bind(message_id)
            .bind(&result.priority)
            .bind(&result.reason)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(tenant_id, message_id, important = result.is_important, "Stored analysis");
        Ok(())
    }
}

impl SqlStore {
    /// Stored analysis of a message
    pub async fn get_analysis(
        &self,
        tenant_id: i64,
        message_id: i64,
    ) -> Result<Option<AnalysisResult>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT analysis_json FROM message_analysis WHERE tenant_id = ? AND message_id = ?",
        )
        .bind(tenant_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(json,)| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    /// Messages flagged important, newest first
    pub async fn important_messages(&self, tenant_id: i64) -> Result<Vec<ImportantMessage>> {
        let rows: Vec<(i64, String, String, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT message_id, priority, reason, created_at FROM important_messages \
             WHERE tenant_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(message_id, priority, reason, created_at)| ImportantMessage {
                message_id,
                priority,
                reason,
                created_at,
            })
            .collect())
    }
}
