use msgflow_llm::{fallback_analysis, Feature, LlmService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::event_bus::{AnalysisEvent, EventBus};
use crate::queue::{AnalysisQueue, QueueMessage};
use crate::shutdown::ShutdownController;
use crate::store::AnalysisStore;

/// Default jobs popped per batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default pause after a failed dequeue
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// Default pause when the queue is empty
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound on one job
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Worker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Jobs popped per batch
    pub batch_size: usize,
    /// Pause after a failed dequeue
    pub error_backoff: Duration,
    /// Pause when the queue is empty
    pub idle_interval: Duration,
    /// Bound on one job's analysis
    pub job_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

impl WorkerConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size (at least 1)
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the empty-queue pause
    #[must_use]
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Set the dequeue-error pause
    #[must_use]
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Set the per-job timeout
    #[must_use]
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }
}

/// Drains a tenant's analysis queue
pub struct AnalysisWorker {
    queue: Arc<dyn AnalysisQueue>,
    service: Arc<LlmService>,
    analyses: Arc<dyn AnalysisStore>,
    events: EventBus,
    config: WorkerConfig,
    shutdown: Option<Arc<ShutdownController>>,
}

impl AnalysisWorker {
    /// Create a worker
    #[must_use]
    pub fn new(
        queue: Arc<dyn AnalysisQueue>,
        service: Arc<LlmService>,
        analyses: Arc<dyn AnalysisStore>,
        events: EventBus,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            service,
            analyses,
            events,
            config,
            shutdown: None,
        }
    }

    /// Hold a shutdown guard while each job runs, so shutdown waits for
    /// popped jobs to be persisted
    #[must_use]
    pub fn with_shutdown(mut self, controller: Arc<ShutdownController>) -> Self {
        self.shutdown = Some(controller);
        self
    }

    /// Worker settings
    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process batches until `token` is cancelled.
    ///
    /// Cancellation is observed between batches and during pauses; a batch
    /// in progress is finished first.
    pub async fn run(&self, tenant_id: i64, token: CancellationToken) {
        info!(tenant_id, "Analysis worker started");
        while !token.is_cancelled() {
            let pause = match self.run_batch(tenant_id).await {
                Ok(0) => self.config.idle_interval,
                Ok(_) => continue,
                Err(e) => {
                    warn!(tenant_id, error = %e, "Failed to dequeue analysis jobs");
                    self.config.error_backoff
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = token.cancelled() => break,
            }
        }
        info!(tenant_id, "Analysis worker stopped");
    }

    /// Pop one batch and process it. Returns the number of jobs popped,
    /// malformed ones included.
    #[instrument(skip(self))]
    pub async fn run_batch(&self, tenant_id: i64) -> Result<usize> {
        let batch = self
            .queue
            .dequeue_batch(tenant_id, self.config.batch_size)
            .await?;
        if !batch.is_empty() {
            debug!(tenant_id, jobs = batch.len(), "Processing analysis batch");
        }
        for raw in &batch {
            self.process_job(tenant_id, raw).await;
        }
        Ok(batch.len())
    }

    /// Returns whether the job produced an analysis
    async fn process_job(&self, tenant_id: i64, raw: &[u8]) -> bool {
        let job: QueueMessage = match serde_json::from_slice(raw) {
            Ok(job) => job,
            Err(e) => {
                warn!(tenant_id, error = %e, "Skipping malformed analysis job");
                return false;
            }
        };
        if job.tenant_id != tenant_id {
            warn!(
                tenant_id,
                job_tenant_id = job.tenant_id,
                message_id = job.message_id,
                "Skipping job queued under another tenant"
            );
            return false;
        }
        if job.feature != Feature::Analyze {
            warn!(tenant_id, message_id = job.message_id, feature = %job.feature, "Skipping unsupported job feature");
            return false;
        }

        let _guard = self.shutdown.as_ref().and_then(|c| c.register_task());

        let analysis = match tokio::time::timeout(
            self.config.job_timeout,
            self.service
                .analyze_with_fallback(tenant_id, &job.content, Some(job.message_id)),
        )
        .await
        {
            Ok(analysis) => analysis,
            Err(_) => {
                warn!(
                    tenant_id,
                    message_id = job.message_id,
                    timeout_secs = self.config.job_timeout.as_secs(),
                    "Analysis timed out, using keyword fallback"
                );
                fallback_analysis(&job.content)
            }
        };

        if let Err(e) = self
            .analyses
            .store_analysis(tenant_id, job.message_id, &analysis)
            .await
        {
            warn!(tenant_id, message_id = job.message_id, error = %e, "Failed to store analysis");
        }

        self.events.publish(AnalysisEvent::new(
            tenant_id,
            job.message_id,
            analysis.is_important,
        ));
        true
    }
}
