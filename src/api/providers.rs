//! Provider administration endpoints
//!
//! GET    /api/v1/llm/providers             - List providers (keys masked)
//! POST   /api/v1/llm/providers             - Create a provider
//! GET    /api/v1/llm/providers/:id         - Get a provider
//! PUT    /api/v1/llm/providers/:id         - Partially update a provider
//! DELETE /api/v1/llm/providers/:id         - Delete a provider
//! POST   /api/v1/llm/providers/:id/test    - Probe a provider and record the result
//! GET    /api/v1/llm/providers/:id/history - Latest configuration changes

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use msgflow_core::{ProviderHistoryEntry, ProviderInput, ProviderRecord};
use msgflow_llm::{HealthCheckResult, HealthStore};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::{ok, ApiError, ApiResponse, ApiResult, AppState};
use crate::middleware::tenant::Tenant;

/// Header naming the user behind a change, recorded in provider history
pub const ACTOR_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: i64,
}

fn actor(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn list_providers(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> ApiResult<Vec<ProviderRecord>> {
    ok(state.store.list_provider_records(tenant_id).await?)
}

async fn create_provider(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    headers: HeaderMap,
    Json(input): Json<ProviderInput>,
) -> Result<Response, ApiError> {
    let record = state
        .store
        .create_provider(tenant_id, input, actor(&headers).as_deref())
        .await?;
    state.service.router().invalidate_tenant(tenant_id);
    state.ensure_tenant_loops(tenant_id);
    info!(tenant_id, provider_id = record.id, provider = %record.provider_name, "Provider created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))).into_response())
}

async fn get_provider(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(provider_id): Path<i64>,
) -> ApiResult<ProviderRecord> {
    ok(state.store.get_provider_record(tenant_id, provider_id).await?)
}

async fn update_provider(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(provider_id): Path<i64>,
    headers: HeaderMap,
    Json(input): Json<ProviderInput>,
) -> ApiResult<ProviderRecord> {
    let record = state
        .store
        .update_provider(tenant_id, provider_id, input, actor(&headers).as_deref())
        .await?;
    state.service.router().invalidate_tenant(tenant_id);
    ok(record)
}

async fn delete_provider(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(provider_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<DeletedResponse> {
    state
        .store
        .delete_provider(tenant_id, provider_id, actor(&headers).as_deref())
        .await?;
    state.service.router().invalidate_tenant(tenant_id);
    ok(DeletedResponse {
        deleted: provider_id,
    })
}

/// Probe now. Vendor failures are recorded and returned as an `error`
/// result; a missing provider is a 404.
async fn test_provider(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(provider_id): Path<i64>,
) -> ApiResult<HealthCheckResult> {
    let result = match state.service.health_check(tenant_id, provider_id).await {
        Ok(result) => result,
        Err(e) if e.is_configuration() => return Err(e.into()),
        Err(e) => HealthCheckResult::failed(Duration::ZERO, e.to_string()),
    };

    if let Err(e) = state
        .store
        .insert_health(tenant_id, provider_id, result.clone())
        .await
    {
        warn!(tenant_id, provider_id, error = %e, "Failed to record provider test");
    }
    ok(result)
}

async fn provider_history(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(provider_id): Path<i64>,
) -> ApiResult<Vec<ProviderHistoryEntry>> {
    ok(state.store.provider_history(tenant_id, provider_id).await?)
}

/// Provider administration routes
pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/llm/providers",
            get(list_providers).post(create_provider),
        )
        .route(
            "/api/v1/llm/providers/:id",
            get(get_provider)
                .put(update_provider)
                .delete(delete_provider),
        )
        .route("/api/v1/llm/providers/:id/test", post(test_provider))
        .route("/api/v1/llm/providers/:id/history", get(provider_history))
}
