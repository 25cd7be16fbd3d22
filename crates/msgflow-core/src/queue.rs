//! Per-tenant analysis queue
//!
//! Jobs are JSON-encoded [`QueueMessage`]s in one Redis list per tenant.
//! Producers `LPUSH`, workers `RPOP`, so each list is FIFO. Delivery is
//! at-least-once from the producer's point of view and at-most-once once a
//! job is popped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use msgflow_llm::Feature;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Redis key prefix; the tenant id is appended
pub const QUEUE_KEY_PREFIX: &str = "llm:queue:";

/// One queued job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Owning tenant
    pub tenant_id: i64,
    /// Message to process
    pub message_id: i64,
    /// Message text
    pub content: String,
    /// Requested operation
    pub feature: Feature,
    /// Enqueue time
    pub created_at: DateTime<Utc>,
}

impl QueueMessage {
    /// Analysis job for one message
    #[must_use]
    pub fn analyze(tenant_id: i64, message_id: i64, content: impl Into<String>) -> Self {
        Self {
            tenant_id,
            message_id,
            content: content.into(),
            feature: Feature::Analyze,
            created_at: Utc::now(),
        }
    }
}

/// Queue of analysis jobs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisQueue: Send + Sync {
    /// Append a job to its tenant's queue
    async fn enqueue(&self, message: &QueueMessage) -> Result<()>;

    /// Pop up to `max` raw jobs, oldest first.
    ///
    /// Jobs are returned undecoded so a malformed entry can be skipped
    /// without failing the batch.
    async fn dequeue_batch(&self, tenant_id: i64, max: usize) -> Result<Vec<Vec<u8>>>;
}

/// Redis list-backed queue
pub struct RedisQueue {
    client: redis::Client,
    prefix: String,
}

impl RedisQueue {
    /// Create a queue for a Redis URL.
    ///
    /// Only parses the URL; connections are opened per call.
    pub fn new(redis_url: &str) -> Result<Self> {
        Self::with_prefix(redis_url, QUEUE_KEY_PREFIX)
    }

    /// Create a queue with a custom key prefix
    pub fn with_prefix(redis_url: &str, prefix: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, tenant_id: i64) -> String {
        format!("{}{}", self.prefix, tenant_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl AnalysisQueue for RedisQueue {
    #[instrument(skip(self, message), fields(tenant_id = message.tenant_id, message_id = message.message_id))]
    async fn enqueue(&self, message: &QueueMessage) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        let mut conn = self.connection().await?;
        redis::cmd("LPUSH")
            .arg(self.key(message.tenant_id))
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await?;
        debug!("Queued analysis job");
        Ok(())
    }

    async fn dequeue_batch(&self, tenant_id: i64, max: usize) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let key = self.key(tenant_id);
        let mut items = Vec::new();

        while items.len() < max {
            let popped: redis::RedisResult<Option<Vec<u8>>> =
                redis::cmd("RPOP").arg(&key).query_async(&mut conn).await;
            match popped {
                Ok(Some(item)) => items.push(item),
                Ok(None) => break,
                // Already-popped jobs would be lost if the error were returned
                Err(e) if !items.is_empty() => {
                    warn!(tenant_id, popped = items.len(), error = %e, "RPOP failed mid-batch");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(items)
    }
}

/// In-process queue for single-node deployments and tests
#[derive(Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<i64, VecDeque<Vec<u8>>>>,
}

impl MemoryQueue {
    /// Empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already-encoded job
    pub fn push_raw(&self, tenant_id: i64, payload: Vec<u8>) {
        self.lists
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(tenant_id)
            .or_default()
            .push_back(payload);
    }

    /// Jobs waiting for a tenant
    #[must_use]
    pub fn len(&self, tenant_id: i64) -> usize {
        self.lists
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tenant_id)
            .map_or(0, VecDeque::len)
    }

    /// Whether a tenant has no waiting jobs
    #[must_use]
    pub fn is_empty(&self, tenant_id: i64) -> bool {
        self.len(tenant_id) == 0
    }
}

#[async_trait]
impl AnalysisQueue for MemoryQueue {
    async fn enqueue(&self, message: &QueueMessage) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        self.push_raw(message.tenant_id, payload);
        Ok(())
    }

    async fn dequeue_batch(&self, tenant_id: i64, max: usize) -> Result<Vec<Vec<u8>>> {
        let mut lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = lists.get_mut(&tenant_id) else {
            return Ok(Vec::new());
        };
        let take = max.min(list.len());
        Ok(list.drain(..take).collect())
    }
}
