//! LLM service
//!
//! Entry point for analysis, summaries and action extraction. Resolves the
//! provider through the router, calls it, and records one usage row per
//! call whatever the outcome.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::cost::UsageRecord;
use crate::error::Result;
use crate::provider::LlmProvider;
use crate::router::LlmRouter;
use crate::store::UsageStore;
use crate::types::{AnalysisResult, Feature, HealthCheckResult, ProviderConfig, SummaryResult};

/// Usage-recording facade over the router
pub struct LlmService {
    router: Arc<LlmRouter>,
    usage: Arc<dyn UsageStore>,
}

impl LlmService {
    /// Create a service
    #[must_use]
    pub fn new(router: Arc<LlmRouter>, usage: Arc<dyn UsageStore>) -> Self {
        Self { router, usage }
    }

    /// The underlying router
    #[must_use]
    pub fn router(&self) -> &Arc<LlmRouter> {
        &self.router
    }

    /// Analyze a message with one provider
    #[instrument(skip(self, message))]
    pub async fn analyze(
        &self,
        tenant_id: i64,
        provider_id: i64,
        message: &str,
        message_id: Option<i64>,
    ) -> Result<AnalysisResult> {
        let resolved = self.router.resolve(tenant_id, provider_id).await?;
        let started = Instant::now();
        let outcome = resolved.provider.analyze(message).await;
        self.record(
            tenant_id,
            &resolved.config,
            resolved.provider.as_ref(),
            message_id,
            Feature::Analyze,
            started.elapsed(),
            outcome.as_ref().err(),
        )
        .await;
        outcome
    }

    /// Summarise a conversation with one provider
    #[instrument(skip(self, messages), fields(count = messages.len()))]
    pub async fn summarize(
        &self,
        tenant_id: i64,
        provider_id: i64,
        messages: &[String],
    ) -> Result<SummaryResult> {
        let resolved = self.router.resolve(tenant_id, provider_id).await?;
        let started = Instant::now();
        let outcome = resolved.provider.summarize(messages).await;
        self.record(
            tenant_id,
            &resolved.config,
            resolved.provider.as_ref(),
            None,
            Feature::Summarize,
            started.elapsed(),
            outcome.as_ref().err(),
        )
        .await;
        outcome
    }

    /// Extract action items with one provider
    #[instrument(skip(self, text))]
    pub async fn extract_actions(
        &self,
        tenant_id: i64,
        provider_id: i64,
        text: &str,
    ) -> Result<Vec<String>> {
        let resolved = self.router.resolve(tenant_id, provider_id).await?;
        let started = Instant::now();
        let outcome = resolved.provider.extract_actions(text).await;
        self.record(
            tenant_id,
            &resolved.config,
            resolved.provider.as_ref(),
            None,
            Feature::ExtractActions,
            started.elapsed(),
            outcome.as_ref().err(),
        )
        .await;
        outcome
    }

    /// Analyze with ordered fallback; never fails.
    ///
    /// Usage is recorded only for the provider that succeeded.
    #[instrument(skip(self, message))]
    pub async fn analyze_with_fallback(
        &self,
        tenant_id: i64,
        message: &str,
        message_id: Option<i64>,
    ) -> AnalysisResult {
        let started = Instant::now();
        let outcome = self.router.analyze_with_fallback(tenant_id, message).await;

        if let (Some(provider), Some(config)) = (&outcome.provider, &outcome.config) {
            self.record(
                tenant_id,
                config,
                provider.as_ref(),
                message_id,
                Feature::Analyze,
                started.elapsed(),
                None,
            )
            .await;
        }
        if let Some(e) = &outcome.error {
            info!(tenant_id, error = %e, "Serving keyword fallback analysis");
        }
        outcome.result
    }

    /// Probe one provider
    #[instrument(skip(self))]
    pub async fn health_check(&self, tenant_id: i64, provider_id: i64) -> Result<HealthCheckResult> {
        let provider = self.router.get_provider(tenant_id, provider_id).await?;
        provider.health_check().await
    }

    /// Build and persist the usage row of a finished call.
    ///
    /// The row is attributed to `config`, the record the call was resolved
    /// from. Insert failures are logged and swallowed.
    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        tenant_id: i64,
        config: &ProviderConfig,
        provider: &dyn LlmProvider,
        message_id: Option<i64>,
        feature: Feature,
        elapsed: Duration,
        error: Option<&crate::Error>,
    ) {
        let record = usage_from_provider(provider, feature, elapsed, error);
        if let Err(e) = self
            .usage
            .insert_usage(
                tenant_id,
                config.id,
                message_id,
                record,
                config.cost_per_1k_input,
                config.cost_per_1k_output,
            )
            .await
        {
            warn!(tenant_id, provider_id = config.id, error = %e, "Failed to record LLM usage");
        }
    }
}

/// Usage row for a finished call: the provider's last record when it has
/// one, else latency only.
fn usage_from_provider(
    provider: &dyn LlmProvider,
    feature: Feature,
    elapsed: Duration,
    error: Option<&crate::Error>,
) -> UsageRecord {
    let mut record = provider.last_usage_record().unwrap_or_else(|| UsageRecord {
        latency: elapsed,
        success: true,
        ..UsageRecord::default()
    });
    if record.total_tokens == 0 {
        record.latency = elapsed;
    }
    record.feature = Some(feature);
    match error {
        Some(e) => {
            record.success = false;
            record.error_message = Some(e.to_string());
        }
        None => {
            record.success = true;
            record.error_message = None;
        }
    }
    record
}
