// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The config-refresh ticker (component H, §4.8).
//!
//! Independent of the job loop: fetches a fresh `RunnerConfig` on its own
//! period and drops it into the [`RefreshSlot`] the job loop drains once
//! idle. Never calls `ApplyRefresh` itself — that stays the job loop's
//! privilege, since it alone knows whether a job is in flight.

use crate::job_loop::RefreshSlot;
use mush_adapters::{Executor, Refreshable};
use mush_api::RunnerApi;
use mush_core::RunnerConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Polls `GetRunnerConfig` on a ticker, storing a pending config whenever
/// at least one executor reports it needs a refresh.
pub struct RefreshLoop {
    api: Arc<dyn RunnerApi>,
    executors: HashMap<String, Arc<dyn Executor>>,
    slot: RefreshSlot,
    period: Duration,
}

impl RefreshLoop {
    pub fn new(
        api: Arc<dyn RunnerApi>,
        executors: HashMap<String, Arc<dyn Executor>>,
        slot: RefreshSlot,
        period: Duration,
    ) -> Self {
        Self {
            api,
            executors,
            slot,
            period,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut period = self.period;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(period) => {}
            }

            match self.api.get_runner_config().await {
                Ok(cfg) => {
                    period = cfg.normalized_refresh_interval();
                    if self.any_executor_needs_refresh(&cfg) {
                        *self.slot.lock() = Some(cfg);
                    }
                }
                Err(e) => warn!(error = %e, "config refresh fetch failed"),
            }
        }
    }

    fn any_executor_needs_refresh(&self, cfg: &RunnerConfig) -> bool {
        self.executors
            .values()
            .filter_map(|e| e.as_refreshable())
            .any(|r| r.needs_refresh(cfg))
    }
}

#[cfg(test)]
#[path = "refresh_loop_tests.rs"]
mod tests;
