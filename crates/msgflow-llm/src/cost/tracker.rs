//! Usage Tracker - per-instance counters
//!
//! Every provider instance owns one tracker. It keeps the running
//! [`UsageStats`] and the record of the most recent call, which the service
//! reads right after the call returns.

use super::record::{UsageRecord, UsageStats};
use crate::util::average_latency;
use std::sync::Mutex;

/// Running usage counters plus the most recent call record
#[derive(Debug, Default)]
pub struct UsageTracker {
    stats: Mutex<UsageStats>,
    last: Mutex<Option<UsageRecord>>,
}

impl UsageTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished call into the counters
    pub fn capture(&self, record: UsageRecord, input_cost_per_1k: f64, output_cost_per_1k: f64) {
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            stats.total_requests += 1;
            if record.success {
                stats.successful_requests += 1;
                stats.total_cost += record.total_cost(input_cost_per_1k, output_cost_per_1k);
                stats.avg_latency = average_latency(
                    stats.avg_latency,
                    record.latency,
                    stats.successful_requests,
                );
            } else {
                stats.failed_requests += 1;
            }
        }
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(record);
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> UsageStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Record of the most recent call
    #[must_use]
    pub fn last_record(&self) -> Option<UsageRecord> {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
