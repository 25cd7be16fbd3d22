//! Store records, inputs and report rows

use chrono::{DateTime, Utc};
use msgflow_llm::{HealthStatus, ProviderConfig};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// API key placeholder in administrative views
pub const MASKED_API_KEY: &str = "****";

/// Provider as shown to administrators; the key is always masked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRecord {
    /// Provider ID
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// Vendor tag
    pub provider_name: String,
    /// Always [`MASKED_API_KEY`]
    pub api_key: String,
    /// Model
    pub model_name: String,
    /// Label shown in the dashboard
    pub display_name: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Azure resource endpoint
    pub azure_endpoint: Option<String>,
    /// Azure deployment name
    pub azure_deployment: Option<String>,
    /// Azure API version
    pub azure_api_version: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
    /// USD per 1K input tokens
    pub cost_per_1k_input: f64,
    /// USD per 1K output tokens
    pub cost_per_1k_output: f64,
    /// Requests per minute limit
    pub max_requests_per_minute: u32,
    /// Requests per day limit
    pub max_requests_per_day: u32,
    /// Monthly spend limit (USD)
    pub monthly_budget: Option<f64>,
    /// Participates in routing and health checks
    pub is_active: bool,
    /// Tenant default
    pub is_default: bool,
    /// Marked as fallback
    pub is_fallback: bool,
    /// Last summarised probe status
    pub health_status: HealthStatus,
    /// Time of the last status change
    pub last_health_check: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Administrative create/update payload.
///
/// On create, `provider_name` and `api_key` are required and omitted fields
/// take vendor defaults. On update, omitted fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderInput {
    /// Vendor tag
    pub provider_name: Option<String>,
    /// Plaintext API key; encrypted before it is stored
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model
    pub model_name: Option<String>,
    /// Dashboard label
    pub display_name: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Azure resource endpoint
    pub azure_endpoint: Option<String>,
    /// Azure deployment name
    pub azure_deployment: Option<String>,
    /// Azure API version
    pub azure_api_version: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Completion token limit
    pub max_tokens: Option<u32>,
    /// USD per 1K input tokens
    pub cost_per_1k_input: Option<f64>,
    /// USD per 1K output tokens
    pub cost_per_1k_output: Option<f64>,
    /// Requests per minute limit
    pub max_requests_per_minute: Option<u32>,
    /// Requests per day limit
    pub max_requests_per_day: Option<u32>,
    /// Monthly spend limit (USD)
    pub monthly_budget: Option<f64>,
    /// Active flag
    pub is_active: Option<bool>,
    /// Default flag
    pub is_default: Option<bool>,
    /// Fallback flag
    pub is_fallback: Option<bool>,
}

impl ProviderInput {
    /// Minimal create payload
    #[must_use]
    pub fn new(provider_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider_name: Some(provider_name.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    /// Set the default flag
    #[must_use]
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    /// Set the active flag
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

/// One entry of a provider's change log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHistoryEntry {
    /// Entry ID
    pub id: i64,
    /// Provider the change applies to
    pub provider_id: i64,
    /// Change description
    pub change: serde_json::Value,
    /// Who made the change
    pub changed_by: Option<String>,
    /// When
    pub created_at: DateTime<Utc>,
}

/// Spend grouped under one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBucket {
    /// Vendor tag or feature name
    pub key: String,
    /// USD
    pub total_cost: f64,
}

/// Spend for one day (`YYYY-MM-DD`, UTC)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCost {
    /// Day
    pub day: String,
    /// USD
    pub total_cost: f64,
}

/// Tenant spend breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    /// Total spend (USD)
    pub total_cost: f64,
    /// By vendor, highest first
    pub provider_costs: Vec<CostBucket>,
    /// By feature, highest first
    pub feature_costs: Vec<CostBucket>,
    /// Last 30 days with usage, newest first
    pub daily_costs: Vec<DailyCost>,
    /// Budget the alert was evaluated against
    pub budget: Option<f64>,
    /// Spend reached 80% of the budget
    pub budget_alert: bool,
}

/// Health row of the health overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealthSummary {
    /// Provider ID
    pub provider_id: i64,
    /// Vendor tag
    pub provider: String,
    /// Stored status
    pub status: HealthStatus,
    /// Last status change
    pub last_check: Option<DateTime<Utc>>,
    /// Mean probe latency
    pub avg_latency_ms: f64,
}

/// Row of the provider comparison report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderComparison {
    /// Provider ID
    pub provider_id: i64,
    /// Vendor tag
    pub provider: String,
    /// Model
    pub model: String,
    /// Mean call latency
    pub avg_latency_ms: f64,
    /// Successful calls, percent
    pub success_rate: f64,
    /// Spend (USD)
    pub monthly_spent: f64,
    /// Calls
    pub requests: i64,
}

/// Message flagged important by analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportantMessage {
    /// Message ID
    pub message_id: i64,
    /// `high` or `medium`
    pub priority: String,
    /// Analysis reason
    pub reason: String,
    /// When it was flagged
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub(super) struct ProviderRow {
    pub id: i64,
    pub tenant_id: i64,
    pub provider_name: String,
    pub api_key: String,
    pub model_name: String,
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
    pub temperature: f64,
    pub max_tokens: i64,
    pub cost_per_1k_input: f64,
    pub cost_per_1k_output: f64,
    pub max_requests_per_minute: i64,
    pub max_requests_per_day: i64,
    pub monthly_budget: Option<f64>,
    pub is_active: bool,
    pub is_default: bool,
    pub is_fallback: bool,
    pub health_status: String,
    pub last_health_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl ProviderRow {
    /// Runtime configuration; `api_key` is whatever the caller put in the row
    pub fn into_config(self) -> ProviderConfig {
        ProviderConfig {
            id: self.id,
            provider_name: self.provider_name,
            api_key: self.api_key,
            model_name: self.model_name,
            base_url: self.base_url,
            azure_endpoint: self.azure_endpoint,
            azure_deployment: self.azure_deployment,
            azure_api_version: self.azure_api_version,
            temperature: self.temperature as f32,
            max_tokens: to_u32(self.max_tokens),
            cost_per_1k_input: self.cost_per_1k_input,
            cost_per_1k_output: self.cost_per_1k_output,
            max_requests_per_minute: to_u32(self.max_requests_per_minute),
        }
    }

    /// Administrative view with the key masked
    pub fn into_record(self) -> ProviderRecord {
        ProviderRecord {
            id: self.id,
            tenant_id: self.tenant_id,
            provider_name: self.provider_name,
            api_key: MASKED_API_KEY.to_string(),
            model_name: self.model_name,
            display_name: self.display_name,
            base_url: self.base_url,
            azure_endpoint: self.azure_endpoint,
            azure_deployment: self.azure_deployment,
            azure_api_version: self.azure_api_version,
            temperature: self.temperature as f32,
            max_tokens: to_u32(self.max_tokens),
            cost_per_1k_input: self.cost_per_1k_input,
            cost_per_1k_output: self.cost_per_1k_output,
            max_requests_per_minute: to_u32(self.max_requests_per_minute),
            max_requests_per_day: to_u32(self.max_requests_per_day),
            monthly_budget: self.monthly_budget,
            is_active: self.is_active,
            is_default: self.is_default,
            is_fallback: self.is_fallback,
            health_status: self.health_status.parse().unwrap_or(HealthStatus::Unknown),
            last_health_check: self.last_health_check,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub(super) struct HistoryRow {
    pub id: i64,
    pub provider_id: i64,
    pub change_json: String,
    pub changed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRow> for ProviderHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            provider_id: row.provider_id,
            change: serde_json::from_str(&row.change_json)
                .unwrap_or(serde_json::Value::String(row.change_json)),
            changed_by: row.changed_by,
            created_at: row.created_at,
        }
    }
}
