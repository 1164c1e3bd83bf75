// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges the engine's shared state and counters into the terminal
//! controller's [`mush_terminal::StatusSource`] seam.

use std::time::Instant;

use mush_engine::{HeartbeatHealth, SharedState, UsageMetricsCollector};
use mush_terminal::{Mode, StatusSnapshot, StatusSource};

pub struct EngineStatusSource {
    habitat_id: String,
    state: SharedState,
    metrics: UsageMetricsCollector,
    heartbeat: HeartbeatHealth,
    queue_id: String,
}

impl EngineStatusSource {
    pub fn new(
        habitat_id: String,
        state: SharedState,
        metrics: UsageMetricsCollector,
        heartbeat: HeartbeatHealth,
        queue_id: String,
    ) -> Self {
        Self {
            habitat_id,
            state,
            metrics,
            heartbeat,
            queue_id,
        }
    }
}

impl StatusSource for EngineStatusSource {
    fn snapshot(&self, mode: Mode) -> StatusSnapshot {
        let now = Instant::now();
        StatusSnapshot {
            habitat_id: self.habitat_id.clone(),
            status: self.state.status(),
            mode,
            job_id: self.state.current_job().map(|id| id.as_str().to_string()),
            heartbeat_age: self.heartbeat.age(now),
            queue_id: self.queue_id.clone(),
            done: self.metrics.completed(),
            failed: self.metrics.failed(),
            last_error: self
                .state
                .recent_last_error(now, std::time::Duration::from_secs(30)),
        }
    }

    fn has_active_persistent_job(&self) -> bool {
        self.state.current_job().is_some()
    }
}
