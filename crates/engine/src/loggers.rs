// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured job/queue/runner loggers.
//!
//! Thin `tracing` wrappers that attach consistent fields per entity so the
//! job loop, refresh loop, and link registration don't each hand-roll their
//! own span/event shape. Emission only — no on-disk sink of its own;
//! whatever `tracing-subscriber` layer the binary installs decides where
//! these events end up.

use tracing::{info, warn};

/// Logs job lifecycle events with a consistent `job_id`/`queue_id` field set.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobLogger;

impl JobLogger {
    pub fn new() -> Self {
        Self
    }

    /// A job entered `step` with a human-readable `message`.
    pub fn step(&self, job_id: &str, queue_id: &str, step: &str, message: &str) {
        info!(job_id, queue_id, step, "{message}");
    }

    /// A job failed at `step`; logged at `warn` since it's surfaced to the
    /// remote as a `FailJob` call regardless.
    pub fn failure(&self, job_id: &str, queue_id: &str, step: &str, reason: &str, message: &str) {
        warn!(job_id, queue_id, step, reason, "{message}");
    }
}

/// Logs queue-level events (claim attempts, empty polls).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueLogger;

impl QueueLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn event(&self, queue_id: &str, message: &str) {
        info!(queue_id, "{message}");
    }
}

/// Logs runner-level lifecycle events (startup, shutdown, link state).
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerLogger;

impl WorkerLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn event(&self, habitat_id: &str, message: &str) {
        info!(habitat_id, "{message}");
    }
}

#[cfg(test)]
#[path = "loggers_tests.rs"]
mod tests;
