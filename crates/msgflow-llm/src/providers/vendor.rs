//! Shared provider implementation over a vendor chat client

use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cost::{UsageRecord, UsageStats, UsageTracker};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::retry::Retrier;
use crate::types::{duration_millis, AnalysisResult, HealthCheckResult, ProviderConfig, SummaryResult};
use crate::util::{extract_json, join_lines, sanitize_error_for_user};

/// Prompt prefix for message analysis
pub const ANALYZE_PROMPT: &str = "Analyze this message JSON-only response with: \
is_important(bool), priority(high|medium|low), reason, has_action(bool), action_required, \
sentiment(positive|neutral|negative), sentiment_score(-1 to 1), topics[], confidence(0-1)\n\nMessage: ";

/// Prompt prefix for conversation summaries
pub const SUMMARIZE_PROMPT: &str =
    "Summarize conversation with: summary, key_points[], action_items[], sentiment, topics[]\n\nMessages: ";

/// Prompt prefix for action extraction
pub const EXTRACT_ACTIONS_PROMPT: &str = "Extract action items as JSON array of strings\n\nText: ";

/// Health probe prompt
pub const HEALTH_PROMPT: &str = "Respond with: OK";

/// Longest vendor error body kept in error messages
const MAX_ERROR_BODY: usize = 200;

/// One prompt sent to a vendor
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Single user turn
    pub prompt: String,
    /// Max output tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Ask the vendor for a JSON object response when it supports it
    pub json_mode: bool,
}

/// Vendor completion text plus token counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    /// Completion text
    pub text: String,
    /// Input tokens billed
    pub input_tokens: u32,
    /// Output tokens billed
    pub output_tokens: u32,
}

/// Thin HTTP adapter for one vendor family
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Vendor name reported by the provider
    fn vendor(&self) -> &str;

    /// Issue one completion request, no retry
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion>;

    /// Prompt prefix for action extraction
    fn actions_prompt(&self) -> &'static str {
        EXTRACT_ACTIONS_PROMPT
    }
}

/// Per-vendor call bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VendorSettings {
    /// Overall deadline of one call, retries included
    pub timeout: Duration,
    /// Retry policy
    pub retrier: Retrier,
    /// Max output tokens of a health probe
    pub probe_max_tokens: u32,
}

impl VendorSettings {
    /// Settings with 3 attempts starting at `initial_delay`
    #[must_use]
    pub fn new(timeout: Duration, initial_delay: Duration) -> Self {
        Self {
            timeout,
            retrier: Retrier::new(3, initial_delay),
            probe_max_tokens: 32,
        }
    }

    /// Override the probe token limit
    #[must_use]
    pub fn with_probe_max_tokens(mut self, max_tokens: u32) -> Self {
        self.probe_max_tokens = max_tokens;
        self
    }
}

/// [`LlmProvider`] over any [`ChatClient`]
pub struct VendorProvider<C> {
    client: C,
    config: ProviderConfig,
    settings: VendorSettings,
    tracker: UsageTracker,
}

impl<C: ChatClient> VendorProvider<C> {
    /// Wrap a client
    #[must_use]
    pub fn from_client(client: C, config: ProviderConfig, settings: VendorSettings) -> Self {
        Self {
            client,
            config,
            settings,
            tracker: UsageTracker::new(),
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retrier(mut self, retrier: Retrier) -> Self {
        self.settings.retrier = retrier;
        self
    }

    /// Override the overall call deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Call bounds in effect
    #[must_use]
    pub fn settings(&self) -> &VendorSettings {
        &self.settings
    }

    fn request(&self, prompt: String, json_mode: bool) -> ChatRequest {
        ChatRequest {
            prompt,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            json_mode,
        }
    }

    /// Retried, deadline-bounded call. Every outcome lands in the tracker.
    async fn call(&self, request: ChatRequest) -> Result<ChatCompletion> {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;

        let client = &self.client;
        let request = &request;
        let attempt = || async move {
            let completion = client.complete(request).await?;
            if completion.text.trim().is_empty() {
                return Err(Error::EmptyResponse);
            }
            Ok(completion)
        };
        let outcome = tokio::time::timeout_at(
            deadline,
            self.settings.retrier.run(Some(deadline), attempt),
        )
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(duration_millis(self.settings.timeout))));

        let latency = started.elapsed();
        let record = match &outcome {
            Ok(completion) => {
                UsageRecord::success(completion.input_tokens, completion.output_tokens, latency)
            }
            Err(e) => UsageRecord::failure(latency, e.to_string()),
        };
        self.tracker.capture(
            record,
            self.config.cost_per_1k_input,
            self.config.cost_per_1k_output,
        );
        outcome
    }
}

/// Parse the JSON-shaped part of a completion
fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(extract_json(text)).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Action items come back either as a bare array or as `{"actions": [...]}`
fn parse_actions(text: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Actions {
        List(Vec<String>),
        Wrapped { actions: Vec<String> },
    }

    match parse_json::<Actions>(text)? {
        Actions::List(actions) | Actions::Wrapped { actions } => Ok(actions),
    }
}

#[async_trait::async_trait]
impl<C: ChatClient> LlmProvider for VendorProvider<C> {
    fn name(&self) -> &str {
        self.client.vendor()
    }

    #[instrument(skip(self, message), fields(provider = %self.client.vendor(), model = %self.config.model_name))]
    async fn analyze(&self, message: &str) -> Result<AnalysisResult> {
        let completion = self
            .call(self.request(format!("{ANALYZE_PROMPT}{message}"), true))
            .await?;
        parse_json(&completion.text)
    }

    #[instrument(skip(self, messages), fields(provider = %self.client.vendor(), count = messages.len()))]
    async fn summarize(&self, messages: &[String]) -> Result<SummaryResult> {
        let prompt = format!("{SUMMARIZE_PROMPT}{}", join_lines(messages));
        let completion = self.call(self.request(prompt, false)).await?;
        parse_json(&completion.text)
    }

    #[instrument(skip(self, text), fields(provider = %self.client.vendor()))]
    async fn extract_actions(&self, text: &str) -> Result<Vec<String>> {
        let prompt = format!("{}{text}", self.client.actions_prompt());
        let completion = self.call(self.request(prompt, true)).await?;
        parse_actions(&completion.text)
    }

    async fn health_check(&self) -> Result<HealthCheckResult> {
        let request = ChatRequest {
            prompt: HEALTH_PROMPT.to_string(),
            max_tokens: self.settings.probe_max_tokens,
            temperature: 0.0,
            json_mode: false,
        };

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.settings.timeout, self.client.complete(&request)).await;
        let latency = started.elapsed();

        let result = match outcome {
            Ok(Ok(completion)) => {
                let mut result = HealthCheckResult::ok(latency);
                result.estimated_cost = UsageRecord::success(
                    completion.input_tokens,
                    completion.output_tokens,
                    latency,
                )
                .total_cost(self.config.cost_per_1k_input, self.config.cost_per_1k_output);
                result
            }
            Ok(Err(e)) => {
                warn!(provider = %self.client.vendor(), error = %e, "Health probe failed");
                HealthCheckResult::failed(latency, sanitize_error_for_user(&e.to_string()))
            }
            Err(_) => HealthCheckResult::failed(
                latency,
                Error::Timeout(duration_millis(self.settings.timeout)).to_string(),
            ),
        };
        debug!(provider = %self.client.vendor(), status = %result.status, latency_ms = result.latency_ms, "Health probe finished");
        Ok(result)
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn usage(&self) -> UsageStats {
        self.tracker.stats()
    }

    fn last_usage_record(&self) -> Option<UsageRecord> {
        self.tracker.last_record()
    }
}

/// Read a vendor response, mapping HTTP failures onto [`Error`]
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    if status.as_u16() == 429 {
        return Err(Error::RateLimit);
    }
    if !status.is_success() {
        let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
        // SECURITY: vendor bodies may echo credentials
        return Err(Error::Api(sanitize_error_for_user(&format!(
            "HTTP {}: {}",
            status.as_u16(),
            snippet
        ))));
    }

    serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Build the shared HTTP client for a vendor
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}
