// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-loop counters exposed to the status bar (§4.9) and, ahead of a
//! future `/metrics`-style surface, to anything else that wants them.
//!
//! Kept to in-memory atomics: no exporter, no session-log scanning.
//! Exporter setup is explicitly out of scope (§1).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared counters incremented by the job loop as jobs are reported.
#[derive(Debug, Clone, Default)]
pub struct UsageMetricsCollector {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl UsageMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A job reported `Complete` successfully (§4.7 "Counters").
    pub fn record_completed(&self) {
        self.inner.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A job reported `Fail`, or a successful-execution `Complete` report
    /// itself failed and was demoted to a retryable failure (§7
    /// `completion_report_failed`). Either way it counts as `failed`
    /// (§4.7: "a failed report of a failure still increments `failed`").
    pub fn record_failed(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::Relaxed)
    }
}

/// Tracks the age of the most recent successful heartbeat for the status
/// bar's `HB: <age>` field (§4.9).
#[derive(Debug, Clone)]
pub struct HeartbeatHealth {
    last_success: Arc<parking_lot::Mutex<Option<Instant>>>,
}

impl Default for HeartbeatHealth {
    fn default() -> Self {
        Self {
            last_success: Arc::new(parking_lot::Mutex::new(None)),
        }
    }
}

impl HeartbeatHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at: Instant) {
        *self.last_success.lock() = Some(at);
    }

    /// Age of the last successful heartbeat as of `now`, or `None` if no
    /// heartbeat has ever succeeded.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.last_success.lock().map(|at| now.saturating_duration_since(at))
    }
}

#[cfg(test)]
#[path = "usage_metrics_tests.rs"]
mod tests;
