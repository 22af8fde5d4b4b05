//! Rolling per-topic metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Smoothing factor of the latency moving average.
pub const LATENCY_ALPHA: f64 = 0.2;

/// Counters updated on every handler invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicMetrics {
    /// Handler invocations, successful or not
    pub events_processed: u64,
    /// Failed handler invocations
    pub errors: u64,
    /// Time of the last invocation
    pub last_processed: Option<DateTime<Utc>>,
    /// Exponential moving average of successful latencies, in seconds
    pub latency_avg: f64,
}

impl TopicMetrics {
    /// Record a successful invocation.
    pub fn record_success(&mut self, latency: Duration) {
        self.events_processed += 1;
        self.last_processed = Some(Utc::now());
        self.latency_avg =
            LATENCY_ALPHA * latency.as_secs_f64() + (1.0 - LATENCY_ALPHA) * self.latency_avg;
    }

    /// Record a failed invocation. Latency is not sampled.
    pub fn record_failure(&mut self) {
        self.events_processed += 1;
        self.errors += 1;
        self.last_processed = Some(Utc::now());
    }

    /// `errors / max(1, events_processed)`
    pub fn error_rate(&self) -> f64 {
        self.errors as f64 / self.events_processed.max(1) as f64
    }
}

/// Metrics as reported by a topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Full topic id
    pub id: String,
    pub handler_count: usize,
    #[serde(flatten)]
    pub metrics: TopicMetrics,
    pub error_rate: f64,
}

impl MetricsSnapshot {
    pub fn new(id: impl Into<String>, handler_count: usize, metrics: TopicMetrics) -> Self {
        let error_rate = metrics.error_rate();
        Self {
            id: id.into(),
            handler_count,
            metrics,
            error_rate,
        }
    }
}
