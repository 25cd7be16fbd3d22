//! Web API module for msgflow
//!
//! Provides REST API endpoints for:
//! - Message analysis, batch analysis and summaries
//! - Provider administration and probes
//! - Usage, cost, health and comparison reports

pub mod health;
pub mod llm;
pub mod providers;
pub mod reports;

#[cfg(test)]
mod tests;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use msgflow_core::{AnalysisQueue, EventBus, SqlStore, WorkerScheduler};
use msgflow_llm::{HealthScheduler, LlmService};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

pub use health::health_routes;
pub use llm::llm_routes;
pub use providers::provider_routes;
pub use reports::report_routes;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqlStore>,
    pub service: Arc<LlmService>,
    /// Set when batch analysis is queued
    pub queue: Option<Arc<dyn AnalysisQueue>>,
    pub workers: Option<Arc<WorkerScheduler>>,
    pub health: Option<Arc<HealthScheduler>>,
    pub events: EventBus,
}

impl AppState {
    /// Make sure the tenant's background loops are running
    pub fn ensure_tenant_loops(&self, tenant_id: i64) {
        if let Some(health) = &self.health {
            health.ensure_tenant(tenant_id);
        }
        if let Some(workers) = &self.workers {
            workers.ensure_tenant(tenant_id);
        }
    }
}

/// Create the API router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(llm_routes())
        .merge(provider_routes())
        .merge(report_routes())
        .with_state(state)
}

/// Envelope of every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler failure mapped onto an HTTP status
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Core(msgflow_core::Error),
    Llm(msgflow_llm::Error),
}

impl From<msgflow_core::Error> for ApiError {
    fn from(err: msgflow_core::Error) -> Self {
        match err {
            msgflow_core::Error::Llm(inner) => Self::Llm(inner),
            other => Self::Core(other),
        }
    }
}

impl From<msgflow_llm::Error> for ApiError {
    fn from(err: msgflow_llm::Error) -> Self {
        Self::Llm(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use msgflow_core::Error as Core;
        use msgflow_llm::Error as Llm;
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(Core::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Core(Core::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(Core::Configuration(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Llm(Llm::ProviderNotFound { .. } | Llm::DefaultProviderNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Llm(Llm::Unsupported(_)) => StatusCode::BAD_REQUEST,
            Self::Llm(Llm::RateLimit) => StatusCode::TOO_MANY_REQUESTS,
            Self::Llm(Llm::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Llm(Llm::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Llm(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Core(e) => e.to_string(),
            Self::Llm(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.message(), "Request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.message()))).into_response()
    }
}

/// Handler result
pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a value in a success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
