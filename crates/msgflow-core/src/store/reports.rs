//! Usage, cost, health and comparison reports

use chrono::{DateTime, Utc};
use msgflow_llm::{HealthStatus, UsageStats};
use std::time::Duration;
use tracing::instrument;

use super::types::{CostBucket, CostReport, DailyCost, ProviderComparison, ProviderHealthSummary};
use super::SqlStore;
use crate::error::Result;

/// Share of the budget at which spend raises an alert
const BUDGET_ALERT_RATIO: f64 = 0.8;

/// Days returned by the cost report
const DAILY_COST_DAYS: i64 = 30;

/// Whether `spent` reached the alert share of a positive `budget`
#[must_use]
pub fn budget_alert(spent: f64, budget: Option<f64>) -> bool {
    match budget {
        Some(budget) if budget > 0.0 => spent >= budget * BUDGET_ALERT_RATIO,
        _ => false,
    }
}

/// Successful calls as a percentage; 0 without calls
#[must_use]
pub fn success_rate(successful: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    successful as f64 / total as f64 * 100.0
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl SqlStore {
    /// Tenant-wide call counts, spend and mean latency
    #[instrument(skip(self))]
    pub async fn usage_summary(&self, tenant_id: i64) -> Result<UsageStats> {
        let (total, successful, failed, total_cost, avg_latency_ms): (i64, i64, i64, f64, f64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(CASE WHEN success THEN 1 ELSE 0 END), 0),
                       COALESCE(SUM(CASE WHEN success THEN 0 ELSE 1 END), 0),
                       COALESCE(SUM(total_cost), 0.0),
                       COALESCE(AVG(response_time_ms), 0.0)
                FROM llm_usage_logs
                WHERE tenant_id = ?
                "#,
            )
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(UsageStats {
            total_requests: to_u64(total),
            successful_requests: to_u64(successful),
            failed_requests: to_u64(failed),
            total_cost,
            avg_latency: Duration::from_millis(avg_latency_ms.max(0.0) as u64),
        })
    }

    /// Spend by vendor, feature and day, with a budget alert
    #[instrument(skip(self))]
    pub async fn cost_report(&self, tenant_id: i64, budget: Option<f64>) -> Result<CostReport> {
        let provider_costs: Vec<(String, f64)> = sqlx::query_as(
            r#"
            SELECT p.provider_name, COALESCE(SUM(l.total_cost), 0.0)
            FROM llm_usage_logs l
            JOIN llm_providers p ON p.id = l.provider_id
            WHERE l.tenant_id = ?
            GROUP BY p.provider_name
            ORDER BY 2 DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let feature_costs: Vec<(String, f64)> = sqlx::query_as(
            r#"
            SELECT COALESCE(feature_used, 'unknown'), COALESCE(SUM(total_cost), 0.0)
            FROM llm_usage_logs
            WHERE tenant_id = ?
            GROUP BY 1
            ORDER BY 2 DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let daily_costs: Vec<(String, f64)> = sqlx::query_as(
            r#"
            SELECT substr(created_at, 1, 10) AS day, COALESCE(SUM(total_cost), 0.0)
            FROM llm_usage_logs
            WHERE tenant_id = ?
            GROUP BY day
            ORDER BY day DESC
            LIMIT ?
            "#,
        )
        .bind(tenant_id)
        .bind(DAILY_COST_DAYS)
        .fetch_all(&self.pool)
        .await?;

        // Usage against since-deleted providers only shows up in the total
        let (total_cost,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_cost), 0.0) FROM llm_usage_logs WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        let bucket = |(key, total_cost): (String, f64)| CostBucket { key, total_cost };
        Ok(CostReport {
            total_cost,
            provider_costs: provider_costs.into_iter().map(bucket).collect(),
            feature_costs: feature_costs.into_iter().map(bucket).collect(),
            daily_costs: daily_costs
                .into_iter()
                .map(|(day, total_cost)| DailyCost { day, total_cost })
                .collect(),
            budget,
            budget_alert: budget_alert(total_cost, budget),
        })
    }

    /// Stored status and mean probe latency of every provider
    pub async fn health_overview(&self, tenant_id: i64) -> Result<Vec<ProviderHealthSummary>> {
        let rows: Vec<(i64, String, String, Option<DateTime<Utc>>, f64)> = sqlx::query_as(
            r#"
            SELECT p.id, p.provider_name, p.health_status, p.last_health_check,
                   COALESCE(AVG(h.latency_ms), 0.0)
            FROM llm_providers p
            LEFT JOIN llm_provider_health h ON h.provider_id = p.id AND h.tenant_id = p.tenant_id
            WHERE p.tenant_id = ?
            GROUP BY p.id, p.provider_name, p.health_status, p.last_health_check
            ORDER BY p.id DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(provider_id, provider, status, last_check, avg_latency_ms)| {
                ProviderHealthSummary {
                    provider_id,
                    provider,
                    status: status.parse().unwrap_or(HealthStatus::Unknown),
                    last_check,
                    avg_latency_ms,
                }
            })
            .collect())
    }

    /// Latency, success rate, spend and volume per provider
    pub async fn provider_comparison(&self, tenant_id: i64) -> Result<Vec<ProviderComparison>> {
        let rows: Vec<(i64, String, String, f64, i64, i64, f64)> = sqlx::query_as(
            r#"
            SELECT p.id, p.provider_name, p.model_name,
                   COALESCE(AVG(l.response_time_ms), 0.0),
                   COALESCE(SUM(CASE WHEN l.success THEN 1 ELSE 0 END), 0),
                   COUNT(l.id),
                   COALESCE(SUM(l.total_cost), 0.0)
            FROM llm_providers p
            LEFT JOIN llm_usage_logs l ON l.provider_id = p.id AND l.tenant_id = p.tenant_id
            WHERE p.tenant_id = ?
            GROUP BY p.id, p.provider_name, p.model_name
            ORDER BY p.id DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(provider_id, provider, model, avg_latency_ms, successful, requests, spent)| {
                    ProviderComparison {
                        provider_id,
                        provider,
                        model,
                        avg_latency_ms,
                        success_rate: success_rate(successful, requests),
                        monthly_spent: spent,
                        requests,
                    }
                },
            )
            .collect())
    }
}
