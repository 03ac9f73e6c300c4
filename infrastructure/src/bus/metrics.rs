//! Throughput and error counters for the message bus

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time view of bus activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMetrics {
    pub total_messages: u64,
    pub messages_per_second: f64,
    pub avg_latency_ms: f64,
    /// Errors per attempted publish, in `0.0..=1.0`.
    pub error_rate: f64,
    pub active_subscriptions: usize,
    pub pending_requests: usize,
    pub total_errors: u64,
}

/// Lock-free counters updated on every publish.
#[derive(Debug)]
pub(crate) struct MetricsRecorder {
    started: Instant,
    total_messages: AtomicU64,
    total_errors: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsRecorder {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            total_messages: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_delivery(&self, latency: Duration) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_subscriptions: usize, pending_requests: usize) -> BusMetrics {
        let total_messages = self.total_messages.load(Ordering::Relaxed);
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        let latency_us = self.total_latency_us.load(Ordering::Relaxed);

        let elapsed = self.started.elapsed().as_secs_f64().max(0.001);
        let attempts = total_messages + total_errors;

        BusMetrics {
            total_messages,
            messages_per_second: total_messages as f64 / elapsed,
            avg_latency_ms: if total_messages == 0 {
                0.0
            } else {
                latency_us as f64 / total_messages as f64 / 1000.0
            },
            error_rate: if attempts == 0 {
                0.0
            } else {
                total_errors as f64 / attempts as f64
            },
            active_subscriptions,
            pending_requests,
            total_errors,
        }
    }
}
