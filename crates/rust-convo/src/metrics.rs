//! Metrics collection.
//!
//! This module provides counters and histograms fed from published
//! transcripts, so run statistics are collected without touching the
//! runner.
//!
//! # Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rust_convo::metrics::RunMetrics;
//! use rust_convo::transcript::TranscriptBus;
//!
//! let bus = TranscriptBus::new();
//! let metrics = Arc::new(RunMetrics::new());
//! metrics.attach(&bus);
//!
//! assert_eq!(metrics.snapshot().runs, 0);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ErrorKind;
use crate::transcript::{ListenerId, TranscriptBus, TranscriptEvent, TranscriptListener};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by n.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// A histogram for measuring distributions.
#[derive(Debug)]
pub struct Histogram {
    /// Bucket upper bounds.
    buckets: Vec<f64>,
    /// Counts per bucket, plus one overflow bucket.
    counts: Vec<AtomicU64>,
    /// Sum of all values, as `f64` bits.
    sum: AtomicU64,
    /// Total count.
    count: AtomicU64,
}

impl Histogram {
    /// Create with buckets suited to conversation durations in seconds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0])
    }

    /// Create with custom buckets.
    #[must_use]
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        let counts = (0..=buckets.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum: AtomicU64::new(0f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value.
    pub fn observe(&self, value: f64) {
        let idx = self
            .buckets
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.buckets.len());
        self.counts[idx].fetch_add(1, Ordering::Relaxed);

        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get the sum of observed values.
    #[must_use]
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Get the mean of observed values, 0.0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() / count as f64
        }
    }

    /// Get bucket counts; the last entry counts values above every bound.
    #[must_use]
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversation run metrics.
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Runs published.
    pub runs: Counter,
    /// Runs that failed.
    pub runs_failed: Counter,
    /// Steps attempted across all runs.
    pub steps: Counter,
    /// Run duration histogram, in seconds.
    pub run_duration_seconds: Histogram,
    failures_by_kind: Mutex<BTreeMap<String, u64>>,
}

impl RunMetrics {
    /// Create empty metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register these metrics on a bus.
    pub fn attach(self: &Arc<Self>, bus: &TranscriptBus) -> ListenerId {
        bus.register_shared(Arc::clone(self) as Arc<dyn TranscriptListener>)
    }

    fn record_failure(&self, kind: Option<ErrorKind>) {
        let label = kind.map_or_else(|| "unknown".to_string(), |k| k.to_string());
        let mut failures = self
            .failures_by_kind
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *failures.entry(label).or_insert(0) += 1;
    }

    /// Take a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs: self.runs.get(),
            runs_failed: self.runs_failed.get(),
            steps: self.steps.get(),
            mean_duration_seconds: self.run_duration_seconds.mean(),
            failures_by_kind: self
                .failures_by_kind
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone(),
        }
    }
}

impl TranscriptListener for RunMetrics {
    fn on_transcript(&self, event: &TranscriptEvent<'_>) {
        self.runs.inc();
        self.steps.add(event.transcript.len() as u64);
        self.run_duration_seconds
            .observe(event.transcript.duration().as_secs_f64());
        if !event.outcome.is_success() {
            self.runs_failed.inc();
            let kind = event
                .transcript
                .failed_step()
                .and_then(|(_, step)| step.err.as_ref())
                .map(|err| err.kind);
            self.record_failure(kind);
        }
    }
}

/// A point-in-time view of [`RunMetrics`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Runs published.
    pub runs: u64,
    /// Runs that failed.
    pub runs_failed: u64,
    /// Steps attempted.
    pub steps: u64,
    /// Mean run duration in seconds.
    pub mean_duration_seconds: f64,
    /// Failed runs per error kind.
    pub failures_by_kind: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::error::ConvoError;
    use crate::transcript::{StepError, Transcript, TranscriptStep};
    use crate::types::{RunContext, RunOutcome};

    #[test]
    fn counter_basic() {
        let counter = Counter::new();
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn histogram_sum_and_buckets() {
        let histogram = Histogram::with_buckets(vec![1.0, 2.0]);
        histogram.observe(0.5);
        histogram.observe(1.5);
        histogram.observe(9.0);

        assert_eq!(histogram.count(), 3);
        assert!((histogram.sum() - 11.0).abs() < 1e-9);
        assert_eq!(histogram.bucket_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn metrics_follow_bus() {
        let bus = TranscriptBus::new();
        let metrics = Arc::new(RunMetrics::new());
        metrics.attach(&bus);

        let begin = Utc::now();
        let context = RunContext::new("c", "convo");

        let mut ok = Transcript::new(begin);
        ok.convo_end = begin + TimeDelta::milliseconds(500);
        bus.publish(&context, &ok, RunOutcome::Success);

        let err = ConvoError::InvalidSender {
            step: 0,
            sender: "robot".to_string(),
        };
        let mut failed = Transcript::new(begin);
        failed.steps.push(TranscriptStep {
            step_begin: begin,
            step_end: begin,
            actual: None,
            expected: None,
            not: false,
            err: Some(StepError::from(&err)),
        });
        bus.publish(&context, &failed, RunOutcome::Failure);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs, 2);
        assert_eq!(snapshot.runs_failed, 1);
        assert_eq!(snapshot.steps, 1);
        assert!((snapshot.mean_duration_seconds - 0.25).abs() < 1e-9);
        assert_eq!(snapshot.failures_by_kind.get("invalid sender"), Some(&1));
    }
}
