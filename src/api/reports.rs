//! Usage and health reports
//!
//! GET /api/v1/llm/usage      - Call counts, spend and latency
//! GET /api/v1/llm/costs      - Spend by provider, feature and day (`?budget=`)
//! GET /api/v1/llm/health     - Latest health per provider
//! GET /api/v1/llm/comparison - Side-by-side provider figures

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use msgflow_core::{CostReport, ProviderComparison, ProviderHealthSummary};
use msgflow_llm::UsageStats;
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult, AppState};
use crate::middleware::tenant::Tenant;

/// Usage summary as served over the API
#[derive(Debug, Serialize)]
pub struct UsageView {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percentage of successful calls
    pub success_rate: f64,
    pub total_cost: f64,
    pub avg_latency_ms: u64,
}

impl From<UsageStats> for UsageView {
    fn from(stats: UsageStats) -> Self {
        Self {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            success_rate: stats.success_rate() * 100.0,
            total_cost: stats.total_cost,
            avg_latency_ms: u64::try_from(stats.avg_latency.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CostQuery {
    #[serde(default)]
    pub budget: Option<f64>,
}

async fn usage(State(state): State<AppState>, Tenant(tenant_id): Tenant) -> ApiResult<UsageView> {
    ok(state.store.usage_summary(tenant_id).await?.into())
}

async fn costs(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Query(query): Query<CostQuery>,
) -> ApiResult<CostReport> {
    ok(state.store.cost_report(tenant_id, query.budget).await?)
}

async fn health(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> ApiResult<Vec<ProviderHealthSummary>> {
    ok(state.store.health_overview(tenant_id).await?)
}

async fn comparison(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> ApiResult<Vec<ProviderComparison>> {
    ok(state.store.provider_comparison(tenant_id).await?)
}

/// Report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/llm/usage", get(usage))
        .route("/api/v1/llm/costs", get(costs))
        .route("/api/v1/llm/health", get(health))
        .route("/api/v1/llm/comparison", get(comparison))
}
