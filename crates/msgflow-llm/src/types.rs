//! Core LLM types
//!
//! Provider configuration plus the result shapes every vendor backend
//! produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::Duration;

use crate::util::mask_api_key;

/// One tenant's configuration of one LLM vendor account.
///
/// `api_key` holds the decrypted secret. It only exists in memory, between
/// the store loading the record and the factory building a provider.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider record ID
    pub id: i64,
    /// Vendor tag (`claude`, `openai`, `azure_openai`, `cohere`, ...)
    pub provider_name: String,
    /// Decrypted API key
    pub api_key: String,
    /// Model name sent to the vendor
    pub model_name: String,
    /// Base URL override
    pub base_url: Option<String>,
    /// Azure OpenAI resource endpoint
    pub azure_endpoint: Option<String>,
    /// Azure OpenAI deployment name
    pub azure_deployment: Option<String>,
    /// Azure OpenAI API version
    pub azure_api_version: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Max output tokens
    pub max_tokens: u32,
    /// Cost per 1K input tokens (USD)
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens (USD)
    pub cost_per_1k_output: f64,
    /// Requests per minute allowed by the tenant
    pub max_requests_per_minute: u32,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("provider_name", &self.provider_name)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("azure_endpoint", &self.azure_endpoint)
            .field("azure_deployment", &self.azure_deployment)
            .field("azure_api_version", &self.azure_api_version)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("cost_per_1k_input", &self.cost_per_1k_input)
            .field("cost_per_1k_output", &self.cost_per_1k_output)
            .field("max_requests_per_minute", &self.max_requests_per_minute)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration with the usual generation defaults
    #[must_use]
    pub fn new(id: i64, provider_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            id,
            provider_name: provider_name.into(),
            api_key: String::new(),
            model_name: model_name.into(),
            base_url: None,
            azure_endpoint: None,
            azure_deployment: None,
            azure_api_version: None,
            temperature: 0.2,
            max_tokens: 1024,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
            max_requests_per_minute: 60,
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the Azure endpoint, deployment and API version
    #[must_use]
    pub fn with_azure(
        mut self,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        self.azure_endpoint = Some(endpoint.into());
        self.azure_deployment = Some(deployment.into());
        self.azure_api_version = Some(api_version.into());
        self
    }

    /// Set per-1K token pricing
    #[must_use]
    pub fn with_pricing(mut self, input: f64, output: f64) -> Self {
        self.cost_per_1k_input = input;
        self.cost_per_1k_output = output;
        self
    }

    /// Set max output tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Identity of the live instance built from this configuration.
    ///
    /// Two configurations with the same key share one provider instance.
    /// The secret enters the key only as a fingerprint, so a rotated key
    /// builds a fresh instance instead of reusing the old credential.
    #[must_use]
    pub fn instance_key(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.api_key.hash(&mut hasher);
        format!(
            "{}:{}:{}:{}:{}:{:016x}",
            self.provider_name,
            self.model_name,
            self.base_url.as_deref().unwrap_or_default(),
            self.azure_endpoint.as_deref().unwrap_or_default(),
            self.azure_deployment.as_deref().unwrap_or_default(),
            hasher.finish(),
        )
    }
}

/// Message analysis produced by a vendor or by the keyword fallback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    /// Whether the message needs attention
    pub is_important: bool,
    /// `high` | `medium` | `low`
    pub priority: String,
    /// Why the message was classified this way
    pub reason: String,
    /// Whether the message asks for an action
    pub has_action: bool,
    /// The action asked for
    pub action_required: String,
    /// `positive` | `neutral` | `negative`
    pub sentiment: String,
    /// Sentiment score in [-1, 1]
    pub sentiment_score: f64,
    /// Detected topics
    pub topics: Vec<String>,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// Conversation summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryResult {
    /// Summary text
    pub summary: String,
    /// Key points
    pub key_points: Vec<String>,
    /// Action items
    pub action_items: Vec<String>,
    /// Overall sentiment
    pub sentiment: String,
    /// Topics discussed
    pub topics: Vec<String>,
}

/// Health of a provider, as probed or as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Never probed
    Unknown,
    /// Probe succeeded within the latency threshold
    Ok,
    /// Probe succeeded but exceeded the latency threshold
    Slow,
    /// Probe failed
    Error,
    /// Repeated consecutive probe failures
    Unhealthy,
}

impl HealthStatus {
    /// Stored representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ok => "ok",
            Self::Slow => "slow",
            Self::Error => "error",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "ok" => Ok(Self::Ok),
            "slow" => Ok(Self::Slow),
            "error" => Ok(Self::Error),
            "unhealthy" => Ok(Self::Unhealthy),
            other => Err(format!("unknown health status: {other}")),
        }
    }
}

/// Outcome of one health probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// `ok` or `error` as reported by the provider
    pub status: HealthStatus,
    /// Probe latency in milliseconds
    pub latency_ms: u64,
    /// Estimated probe cost (USD)
    pub estimated_cost: f64,
    /// Error text for failed probes
    pub error_message: Option<String>,
    /// When the probe finished
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    /// A successful probe
    #[must_use]
    pub fn ok(latency: Duration) -> Self {
        Self {
            status: HealthStatus::Ok,
            latency_ms: duration_millis(latency),
            estimated_cost: 0.0,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// A failed probe
    #[must_use]
    pub fn failed(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            latency_ms: duration_millis(latency),
            estimated_cost: 0.0,
            error_message: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// Probe latency
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Feature tag attached to usage records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Single-message analysis
    Analyze,
    /// Conversation summary
    Summarize,
    /// Action item extraction
    ExtractActions,
}

impl Feature {
    /// Stored representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Summarize => "summarize",
            Self::ExtractActions => "extract_actions",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
