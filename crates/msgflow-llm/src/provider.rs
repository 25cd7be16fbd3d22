//! LLM Provider trait definition
//!
//! This module defines the contract every vendor backend implements.

use crate::cost::{UsageRecord, UsageStats};
use crate::error::Result;
use crate::types::{AnalysisResult, HealthCheckResult, ProviderConfig, SummaryResult};

/// A live backend bound to one decrypted [`ProviderConfig`].
///
/// Instances are shared across tenants and tasks through the factory, so
/// every method takes `&self` and internal counters are synchronised.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Vendor name
    fn name(&self) -> &str;

    /// Classify one message
    async fn analyze(&self, message: &str) -> Result<AnalysisResult>;

    /// Summarise a conversation, one line per message
    async fn summarize(&self, messages: &[String]) -> Result<SummaryResult>;

    /// Extract action items from free text
    async fn extract_actions(&self, text: &str) -> Result<Vec<String>>;

    /// Single-attempt liveness probe.
    ///
    /// A vendor failure is reported as `Ok` with `status = error`. `Err`
    /// means the probe could not be issued at all.
    async fn health_check(&self) -> Result<HealthCheckResult>;

    /// Configuration this instance was built from
    fn config(&self) -> &ProviderConfig;

    /// Running usage counters
    fn usage(&self) -> UsageStats;

    /// Usage of the most recent call, if the backend tracks it
    fn last_usage_record(&self) -> Option<UsageRecord> {
        None
    }
}
