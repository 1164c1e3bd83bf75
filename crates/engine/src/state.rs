// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner-wide shared state: connection status, the in-flight job id, and
//! the most recent error — read by the terminal's status bar (§4.9), the
//! job loop, and link heartbeats (`currentJobId`).
//!
//! One `parking_lot::Mutex` gates all of it, following the teacher's
//! "single fine-grained mutex per concern" discipline (§5): never held
//! across an `.await`, always locked, read, and dropped before any I/O.

use mush_core::{ConnectionStatus, JobId};
use std::time::{Duration, Instant};

struct Inner {
    status: ConnectionStatus,
    current_job: Option<JobId>,
    last_error: Option<(String, Instant)>,
}

/// Cheap to clone; every clone shares the same underlying state.
#[derive(Clone)]
pub struct SharedState {
    inner: std::sync::Arc<parking_lot::Mutex<Inner>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            inner: std::sync::Arc::new(parking_lot::Mutex::new(Inner {
                status: ConnectionStatus::Disconnected,
                current_job: None,
                last_error: None,
            })),
        }
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.inner.lock().status = status;
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.inner.lock().current_job.clone()
    }

    pub fn set_current_job(&self, job_id: JobId) {
        self.inner.lock().current_job = Some(job_id);
    }

    pub fn clear_current_job(&self) {
        self.inner.lock().current_job = None;
    }

    pub fn set_last_error(&self, message: impl Into<String>, at: Instant) {
        self.inner.lock().last_error = Some((message.into(), at));
    }

    /// The last error message, if one was set within `window` of `now`
    /// (§4.9 "Error: ... when a last-error was set within 30 s").
    pub fn recent_last_error(&self, now: Instant, window: Duration) -> Option<String> {
        let inner = self.inner.lock();
        inner.last_error.as_ref().and_then(|(message, at)| {
            (now.saturating_duration_since(*at) <= window).then(|| message.clone())
        })
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
