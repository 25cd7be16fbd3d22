//! Usage Records and Statistics
//!
//! This module contains types for tracking LLM usage.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::Feature;

/// Usage of a single provider call.
///
/// Costs are derived from the token counts at read time, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageRecord {
    /// Input tokens
    pub input_tokens: u32,
    /// Output tokens
    pub output_tokens: u32,
    /// Input + output tokens
    pub total_tokens: u32,
    /// Wall-clock latency of the call
    pub latency: Duration,
    /// Was the request successful?
    pub success: bool,
    /// Error text for failed calls
    pub error_message: Option<String>,
    /// Which service operation issued the call
    pub feature: Option<Feature>,
}

impl UsageRecord {
    /// Record for a successful call
    #[must_use]
    pub fn success(input_tokens: u32, output_tokens: u32, latency: Duration) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            latency,
            success: true,
            error_message: None,
            feature: None,
        }
    }

    /// Record for a failed call
    #[must_use]
    pub fn failure(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            latency,
            success: false,
            error_message: Some(error.into()),
            ..Self::default()
        }
    }

    /// Tag the record with a feature
    #[must_use]
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    /// Cost of the input tokens at `cost_per_1k` USD per 1K tokens
    #[must_use]
    pub fn input_cost(&self, cost_per_1k: f64) -> f64 {
        f64::from(self.input_tokens) / 1000.0 * cost_per_1k
    }

    /// Cost of the output tokens at `cost_per_1k` USD per 1K tokens
    #[must_use]
    pub fn output_cost(&self, cost_per_1k: f64) -> f64 {
        f64::from(self.output_tokens) / 1000.0 * cost_per_1k
    }

    /// Total cost of the call
    #[must_use]
    pub fn total_cost(&self, input_cost_per_1k: f64, output_cost_per_1k: f64) -> f64 {
        self.input_cost(input_cost_per_1k) + self.output_cost(output_cost_per_1k)
    }
}

/// Running statistics of one provider instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Total requests
    pub total_requests: u64,
    /// Successful requests
    pub successful_requests: u64,
    /// Failed requests
    pub failed_requests: u64,
    /// Total estimated cost (USD)
    pub total_cost: f64,
    /// Mean latency over successful requests
    pub avg_latency: Duration,
}

impl UsageStats {
    /// Success rate in [0, 1]; 0 when nothing was recorded
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}
