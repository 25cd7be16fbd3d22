//! Analysis and summary endpoints
//!
//! POST /api/v1/llm/analyze        - Analyze one message
//! POST /api/v1/llm/analyze/batch  - Analyze up to 100 messages (queued when Redis is configured)
//! POST /api/v1/llm/summarize      - Summarise a conversation
//! POST /api/v1/llm/actions        - Extract action items
//! GET  /api/v1/llm/important      - Messages flagged important

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use msgflow_core::{AnalysisEvent, AnalysisStore, ImportantMessage, QueueMessage};
use msgflow_llm::{fallback_summary, AnalysisResult, SummaryResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ok, ApiError, ApiResponse, ApiResult, AppState};
use crate::middleware::tenant::Tenant;

/// Most messages accepted by one batch request
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub message: String,
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Pin one provider; without it every active provider is tried in order
    #[serde(default)]
    pub provider_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BatchItem {
    pub message_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub messages: Vec<BatchItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub message_id: i64,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<BatchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub messages: Vec<String>,
    #[serde(default)]
    pub provider_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ActionsRequest {
    pub text: String,
    #[serde(default)]
    pub provider_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<String>,
}

async fn analyze(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalysisResult> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let analysis = match request.provider_id {
        Some(provider_id) => {
            state
                .service
                .analyze(tenant_id, provider_id, &request.message, request.message_id)
                .await?
        }
        None => {
            state
                .service
                .analyze_with_fallback(tenant_id, &request.message, request.message_id)
                .await
        }
    };

    if let Some(message_id) = request.message_id {
        persist(&state, tenant_id, message_id, &analysis).await;
    }
    ok(analysis)
}

async fn analyze_batch(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Json(request): Json<BatchAnalyzeRequest>,
) -> Result<Response, ApiError> {
    let count = request.messages.len();
    if count == 0 {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }
    if count > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_BATCH_SIZE} messages per batch, got {count}"
        )));
    }

    if let Some(queue) = &state.queue {
        for item in request.messages {
            queue
                .enqueue(&QueueMessage::analyze(tenant_id, item.message_id, item.content))
                .await?;
        }
        state.ensure_tenant_loops(tenant_id);
        info!(tenant_id, count, "Queued batch analysis");
        let body = BatchResponse {
            status: "queued",
            count,
            results: Vec::new(),
        };
        return Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(body))).into_response());
    }

    let mut results = Vec::with_capacity(count);
    for item in request.messages {
        let analysis = state
            .service
            .analyze_with_fallback(tenant_id, &item.content, Some(item.message_id))
            .await;
        persist(&state, tenant_id, item.message_id, &analysis).await;
        results.push(BatchResult {
            message_id: item.message_id,
            analysis,
        });
    }
    let body = BatchResponse {
        status: "completed",
        count,
        results,
    };
    Ok(Json(ApiResponse::success(body)).into_response())
}

/// Canned summary on any failure; summaries are best effort
async fn summarize(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Json(request): Json<SummarizeRequest>,
) -> ApiResult<SummaryResult> {
    if request.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    let provider_id = match request.provider_id {
        Some(id) => id,
        None => match state.service.router().resolve_default(tenant_id).await {
            Ok(resolved) => resolved.config.id,
            Err(e) => {
                warn!(tenant_id, error = %e, "No default provider, serving canned summary");
                return ok(fallback_summary());
            }
        },
    };

    match state
        .service
        .summarize(tenant_id, provider_id, &request.messages)
        .await
    {
        Ok(summary) => ok(summary),
        Err(e) => {
            warn!(tenant_id, provider_id, error = %e, "Summary failed, serving canned summary");
            ok(fallback_summary())
        }
    }
}

async fn extract_actions(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Json(request): Json<ActionsRequest>,
) -> ApiResult<ActionsResponse> {
    let provider_id = match request.provider_id {
        Some(id) => id,
        None => {
            state
                .service
                .router()
                .resolve_default(tenant_id)
                .await?
                .config
                .id
        }
    };
    let actions = state
        .service
        .extract_actions(tenant_id, provider_id, &request.text)
        .await?;
    ok(ActionsResponse { actions })
}

async fn important_messages(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> ApiResult<Vec<ImportantMessage>> {
    ok(state.store.important_messages(tenant_id).await?)
}

/// Store an analysis and announce it; failures are logged
async fn persist(state: &AppState, tenant_id: i64, message_id: i64, analysis: &AnalysisResult) {
    if let Err(e) = state
        .store
        .store_analysis(tenant_id, message_id, analysis)
        .await
    {
        warn!(tenant_id, message_id, error = %e, "Failed to store analysis");
    }
    state.events.publish(AnalysisEvent::new(
        tenant_id,
        message_id,
        analysis.is_important,
    ));
}

/// Analysis routes
pub fn llm_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/llm/analyze", post(analyze))
        .route("/api/v1/llm/analyze/batch", post(analyze_batch))
        .route("/api/v1/llm/summarize", post(summarize))
        .route("/api/v1/llm/actions", post(extract_actions))
        .route("/api/v1/llm/important", get(important_messages))
}
