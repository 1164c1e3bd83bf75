// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root `Runner` model (component K): builds every registered executor
//! once at startup, then drives the job loop, config-refresh loop, and
//! link registration concurrently behind one shutdown signal.
//!
//! Setup-time failures are fatal (§7 "Setup-time failures terminate the
//! process") — `Runner::build` returns before anything runs, so the
//! caller's `main` can log the error and exit non-zero without ever
//! entering the loops.

use crate::error::RunnerError;
use crate::job_loop::{new_refresh_slot, JobLoop, JobLoopConfig};
use crate::link::LinkRegistrar;
use crate::refresh_loop::RefreshLoop;
use crate::state::SharedState;
use crate::usage_metrics::{HeartbeatHealth, UsageMetricsCollector};
use mush_adapters::ExecutorRegistry;
use mush_api::RunnerApi;
use mush_core::QueueId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Static configuration a `Runner` is assembled from (§4.7, §4.10).
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub habitat_id: String,
    pub queue_id: QueueId,
    pub poll_seconds: u64,
    pub heartbeat_interval: Duration,
    pub link_name: String,
    pub client_version: String,
    pub instance_id: Option<String>,
    /// Harness names to build eagerly from `registry`; anything the
    /// registry knows about but isn't listed here is never instantiated.
    pub harnesses: Vec<String>,
}

/// Forwards a resize onto whichever executor happens to hold a PTY,
/// without the registry itself having to know which harnesses do.
struct ExecutorResizeProxy(Arc<dyn mush_adapters::Executor>);

impl mush_adapters::Resizable for ExecutorResizeProxy {
    fn resize(&self, rows: u16, cols: u16) {
        if let Some(resizable) = self.0.as_resizable() {
            resizable.resize(rows, cols);
        }
    }
}

pub struct Runner {
    settings: RunnerSettings,
    api: Arc<dyn RunnerApi>,
    executors: HashMap<String, Arc<dyn mush_adapters::Executor>>,
    state: SharedState,
    metrics: UsageMetricsCollector,
    heartbeat_health: HeartbeatHealth,
}

impl Runner {
    /// Build and `setup()` one executor per listed harness. Any setup
    /// failure aborts immediately without touching the others further
    /// than calling `teardown` on what already succeeded.
    pub async fn build(
        settings: RunnerSettings,
        api: Arc<dyn RunnerApi>,
        registry: &ExecutorRegistry,
    ) -> Result<Self, RunnerError> {
        let mut executors: HashMap<String, Arc<dyn mush_adapters::Executor>> = HashMap::new();
        for harness in &settings.harnesses {
            let Some(executor) = registry.build(harness) else {
                return Err(RunnerError::UnknownHarness(harness.clone()));
            };
            if let Err(source) = executor.setup().await {
                for built in executors.values() {
                    built.teardown().await;
                }
                return Err(RunnerError::ExecutorSetup {
                    harness: harness.clone(),
                    source,
                });
            }
            executors.insert(harness.clone(), executor);
        }

        Ok(Self {
            settings,
            api,
            executors,
            state: SharedState::new(),
            metrics: UsageMetricsCollector::new(),
            heartbeat_health: HeartbeatHealth::new(),
        })
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn metrics(&self) -> UsageMetricsCollector {
        self.metrics.clone()
    }

    pub fn heartbeat_health(&self) -> HeartbeatHealth {
        self.heartbeat_health.clone()
    }

    pub fn habitat_id(&self) -> &str {
        &self.settings.habitat_id
    }

    /// Wrap every built executor that exposes the `Resizable` capability,
    /// for the terminal controller (component I) to drive resize into.
    pub fn resizables(&self) -> Vec<Arc<dyn mush_adapters::Resizable>> {
        self.executors
            .values()
            .filter(|e| e.as_resizable().is_some())
            .cloned()
            .map(|e| Arc::new(ExecutorResizeProxy(e)) as Arc<dyn mush_adapters::Resizable>)
            .collect()
    }

    /// Run the job loop, refresh loop, and link registration concurrently
    /// until `cancel` fires, then tear down every executor once.
    pub async fn run(self, cancel: CancellationToken) {
        let refresh_slot = new_refresh_slot();

        let job_loop = JobLoop::new(
            JobLoopConfig {
                habitat_id: self.settings.habitat_id.clone(),
                queue_id: self.settings.queue_id.clone(),
                poll_seconds: self.settings.poll_seconds,
                heartbeat_interval: self.settings.heartbeat_interval,
            },
            self.api.clone(),
            self.executors.clone(),
            self.state.clone(),
            self.metrics.clone(),
            self.heartbeat_health.clone(),
            refresh_slot.clone(),
        );

        let refresh_loop = RefreshLoop::new(
            self.api.clone(),
            self.executors.clone(),
            refresh_slot,
            Duration::from_secs(mush_core::runner_config::REFRESH_INTERVAL_DEFAULT_SECS),
        );

        let registrar = LinkRegistrar::new(
            self.api.clone(),
            self.settings.habitat_id.clone(),
            self.settings.link_name.clone(),
            self.settings.client_version.clone(),
            self.settings.instance_id.clone(),
        );

        let link_task = match registrar.register().await {
            Ok(handle) => {
                let state = self.state.clone();
                let completed_metrics = self.metrics.clone();
                let failed_metrics = self.metrics.clone();
                let cancel = cancel.clone();
                Some(tokio::spawn(async move {
                    registrar
                        .run(
                            &handle,
                            state,
                            move || completed_metrics.completed(),
                            move || failed_metrics.failed(),
                            cancel,
                        )
                        .await;
                }))
            }
            Err(e) => {
                warn!(error = %e, "link registration failed, continuing without it");
                None
            }
        };

        info!(habitat_id = %self.settings.habitat_id, "runner starting");

        tokio::select! {
            _ = job_loop.run(cancel.clone()) => {}
            _ = refresh_loop.run(cancel.clone()) => {}
        }

        cancel.cancel();
        if let Some(task) = link_task {
            let _ = task.await;
        }

        for executor in self.executors.values() {
            executor.teardown().await;
        }
        info!("runner shut down");
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
