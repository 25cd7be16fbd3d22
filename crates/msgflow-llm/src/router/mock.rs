//! Mock LLM Provider for testing
//!
//! Scriptable analysis outcome and health probe, plus an optional shared
//! call log that records the provider id of every call.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cost::{UsageRecord, UsageStats, UsageTracker};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::types::{AnalysisResult, HealthCheckResult, ProviderConfig, SummaryResult};

/// Scripted health probe outcome
#[derive(Debug, Clone, PartialEq)]
pub enum MockProbe {
    /// Probe succeeds with this latency
    Ok(Duration),
    /// Probe reports a vendor failure
    Failed(String),
    /// Probe cannot run
    Unavailable(String),
}

/// A mock provider bound to a configuration
pub struct MockProvider {
    config: ProviderConfig,
    failure: Option<String>,
    analysis: AnalysisResult,
    probe: Mutex<MockProbe>,
    calls: Arc<Mutex<Vec<i64>>>,
    tracker: UsageTracker,
}

impl MockProvider {
    /// Create a mock that succeeds with a default analysis
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            failure: None,
            analysis: AnalysisResult {
                priority: "low".to_string(),
                reason: "mock".to_string(),
                sentiment: "neutral".to_string(),
                confidence: 1.0,
                ..AnalysisResult::default()
            },
            probe: Mutex::new(MockProbe::Ok(Duration::from_millis(50))),
            calls: Arc::new(Mutex::new(Vec::new())),
            tracker: UsageTracker::new(),
        }
    }

    /// Make every call fail with `message`
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Analysis returned on success
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = analysis;
        self
    }

    /// Share a call log with other mocks
    #[must_use]
    pub fn with_call_log(mut self, calls: Arc<Mutex<Vec<i64>>>) -> Self {
        self.calls = calls;
        self
    }

    /// Set the health probe outcome
    #[must_use]
    pub fn with_probe(self, probe: MockProbe) -> Self {
        self.set_probe(probe);
        self
    }

    /// Change the health probe outcome in place
    pub fn set_probe(&self, probe: MockProbe) {
        *self.probe.lock().unwrap_or_else(|e| e.into_inner()) = probe;
    }

    /// Provider ids recorded in the call log
    #[must_use]
    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn invoke<T>(&self, input_tokens: u32, value: impl FnOnce() -> T) -> Result<T> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(self.config.id);

        let latency = Duration::from_millis(10);
        match &self.failure {
            Some(message) => {
                let err = Error::Api(message.clone());
                self.tracker.capture(
                    UsageRecord::failure(latency, err.to_string()),
                    self.config.cost_per_1k_input,
                    self.config.cost_per_1k_output,
                );
                Err(err)
            }
            None => {
                self.tracker.capture(
                    UsageRecord::success(input_tokens, 20, latency),
                    self.config.cost_per_1k_input,
                    self.config.cost_per_1k_output,
                );
                Ok(value())
            }
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, message: &str) -> Result<AnalysisResult> {
        let tokens = u32::try_from(message.len()).unwrap_or(u32::MAX);
        self.invoke(tokens, || self.analysis.clone())
    }

    async fn summarize(&self, messages: &[String]) -> Result<SummaryResult> {
        let tokens = u32::try_from(messages.len() * 10).unwrap_or(u32::MAX);
        self.invoke(tokens, || SummaryResult {
            summary: format!("{} messages", messages.len()),
            sentiment: "neutral".to_string(),
            ..SummaryResult::default()
        })
    }

    async fn extract_actions(&self, text: &str) -> Result<Vec<String>> {
        let tokens = u32::try_from(text.len()).unwrap_or(u32::MAX);
        self.invoke(tokens, || {
            text.split(['.', '\n'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    async fn health_check(&self) -> Result<HealthCheckResult> {
        let probe = self.probe.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match probe {
            MockProbe::Ok(latency) => Ok(HealthCheckResult::ok(latency)),
            MockProbe::Failed(message) => Ok(HealthCheckResult::failed(
                Duration::from_millis(10),
                message,
            )),
            MockProbe::Unavailable(message) => Err(Error::Network(message)),
        }
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
