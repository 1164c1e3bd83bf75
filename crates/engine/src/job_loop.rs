// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The claim/start/heartbeat/complete-or-fail loop (component G, §4.7).
//!
//! Single-threaded control flow, concurrent only with the per-job
//! heartbeat task it spawns and the config-refresh loop (component H)
//! feeding it a pending `RunnerConfig` through [`RefreshSlot`].

use crate::state::SharedState;
use crate::usage_metrics::{HeartbeatHealth, UsageMetricsCollector};
use mush_adapters::{Executor, Refreshable};
use mush_api::RunnerApi;
use mush_core::exec::reason;
use mush_core::{ConnectionStatus, ExecError, ExecResult, Job, QueueId, RunnerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Backoff after a failed `maybeRefreshExecutors` pass (§4.7).
const REFRESH_FAILURE_BACKOFF: Duration = Duration::from_secs(2);
/// Backoff after a failed claim (§4.7).
const CLAIM_FAILURE_BACKOFF: Duration = Duration::from_secs(5);
/// Window the status bar keeps showing the last error (§4.9).
pub const LAST_ERROR_WINDOW: Duration = Duration::from_secs(30);

/// Slot the refresh loop (component H) drops a pending config into; the
/// job loop drains it at the top of an iteration once idle (§4.8).
pub type RefreshSlot = Arc<parking_lot::Mutex<Option<RunnerConfig>>>;

pub fn new_refresh_slot() -> RefreshSlot {
    Arc::new(parking_lot::Mutex::new(None))
}

/// Static, per-process configuration the loop doesn't mutate.
#[derive(Debug, Clone)]
pub struct JobLoopConfig {
    pub habitat_id: String,
    pub queue_id: QueueId,
    pub poll_seconds: u64,
    pub heartbeat_interval: Duration,
}

/// Runs the claim/dispatch/report loop until `cancel` fires.
pub struct JobLoop {
    config: JobLoopConfig,
    api: Arc<dyn RunnerApi>,
    executors: HashMap<String, Arc<dyn Executor>>,
    state: SharedState,
    metrics: UsageMetricsCollector,
    heartbeat_health: HeartbeatHealth,
    refresh_slot: RefreshSlot,
}

impl JobLoop {
    pub fn new(
        config: JobLoopConfig,
        api: Arc<dyn RunnerApi>,
        executors: HashMap<String, Arc<dyn Executor>>,
        state: SharedState,
        metrics: UsageMetricsCollector,
        heartbeat_health: HeartbeatHealth,
        refresh_slot: RefreshSlot,
    ) -> Self {
        Self {
            config,
            api,
            executors,
            state,
            metrics,
            heartbeat_health,
            refresh_slot,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        self.state.set_status(ConnectionStatus::Connected);
        loop {
            if cancel.is_cancelled() {
                return;
            }

            if self.state.current_job().is_none() {
                if let Some(cfg) = self.refresh_slot.lock().take() {
                    if let Err(e) = self.apply_refresh(&cfg).await {
                        warn!(error = %e, "executor refresh failed");
                        self.state.set_last_error(format!("refresh failed: {e}"), Instant::now());
                        if Self::sleep_or_cancel(REFRESH_FAILURE_BACKOFF, &cancel).await {
                            return;
                        }
                        continue;
                    }
                }
            }

            let claimed = tokio::select! {
                _ = cancel.cancelled() => return,
                res = self.api.claim_job(&self.config.habitat_id, &self.config.queue_id, self.config.poll_seconds) => res,
            };

            let job = match claimed {
                Err(e) => {
                    warn!(error = %e, "claim failed");
                    self.state.set_last_error(format!("claim failed: {e}"), Instant::now());
                    if Self::sleep_or_cancel(CLAIM_FAILURE_BACKOFF, &cancel).await {
                        return;
                    }
                    continue;
                }
                Ok(None) => continue,
                Ok(Some(job)) => job,
            };

            self.dispatch(job).await;
        }
    }

    /// Look up the claimed job's harness and either release it (unknown
    /// or unavailable harness type, §4.7 step "if h is empty or not in
    /// supported list") or run it to completion.
    async fn dispatch(&self, job: Job) {
        let harness = job.effective_harness_type().to_string();
        let Some(executor) = self.executors.get(&harness).cloned() else {
            self.state
                .set_last_error(format!("unsupported harness type: {harness}"), Instant::now());
            if let Err(e) = self.api.release_job(&job.id).await {
                warn!(error = %e, job_id = %job.id, "release of unsupported-harness job failed");
            }
            return;
        };

        self.process_job(job, executor).await;
    }

    async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    async fn apply_refresh(&self, cfg: &RunnerConfig) -> Result<(), String> {
        for executor in self.executors.values() {
            if let Some(refreshable) = executor.as_refreshable() {
                if refreshable.needs_refresh(cfg) {
                    refreshable
                        .apply_refresh(cfg)
                        .await
                        .map_err(|e| e.to_string())?;
                }
            }
        }
        Ok(())
    }

    async fn process_job(&self, job: Job, executor: Arc<dyn Executor>) {
        let job_id = job.id.clone();
        let span = tracing::info_span!("job", job_id = %job_id, queue_id = %job.queue_id, harness = %job.effective_harness_type());
        let _enter = span.enter();

        self.state.set_current_job(job_id.clone());
        self.state.set_status(ConnectionStatus::Processing);

        let (heartbeat_shutdown, heartbeat_task) = self.spawn_heartbeat(job_id.clone());

        let outcome = self.execute_job(&job, executor.as_ref()).await;

        let _ = heartbeat_shutdown.send(());
        let _ = heartbeat_task.await;

        match outcome {
            Ok(result) => match self.api.complete_job(&job_id, exec_result_to_output(&result)).await {
                Ok(()) => {
                    self.metrics.record_completed();
                    info!(job_id = %job_id, "job completed");
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "complete report failed, demoting to retryable failure");
                    let err = ExecError::completion_report_failed(e.to_string());
                    self.report_failure(&job_id, &err).await;
                }
            },
            Err(err) => self.report_failure(&job_id, &err).await,
        }

        self.state.clear_current_job();
        self.state.set_status(ConnectionStatus::Connected);
        if let Err(e) = executor.reset().await {
            warn!(job_id = %job_id, error = %e, "executor reset failed");
            self.state.set_last_error(format!("reset failed: {e}"), Instant::now());
        }
    }

    async fn execute_job(&self, job: &Job, executor: &dyn Executor) -> Result<ExecResult, ExecError> {
        if let Err(e) = self.api.start_job(&job.id).await {
            return Err(ExecError::new(
                reason::EXECUTION_ERROR,
                format!("start job failed: {e}"),
                true,
            ));
        }

        let timeout = job.timeout();
        match tokio::time::timeout(timeout, executor.execute(job)).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::timeout(format!(
                "execution exceeded {timeout:?}"
            ))),
        }
    }

    async fn report_failure(&self, job_id: &mush_core::JobId, err: &ExecError) {
        self.metrics.record_failed();
        self.state.set_last_error(err.message.clone(), Instant::now());
        if let Err(e) = self
            .api
            .fail_job(job_id, &err.reason, &err.message, err.retry)
            .await
        {
            warn!(job_id = %job_id, error = %e, "fail report itself failed");
            self.state.set_last_error(format!("fail report failed: {e}"), Instant::now());
        }
    }

    fn spawn_heartbeat(
        &self,
        job_id: mush_core::JobId,
    ) -> (oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let api = Arc::clone(&self.api);
        let interval = self.config.heartbeat_interval;
        let health = self.heartbeat_health.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                match api.heartbeat_job(&job_id).await {
                    Ok(()) => health.record_success(Instant::now()),
                    Err(e) => warn!(job_id = %job_id, error = %e, "heartbeat failed"),
                }
            }
        });

        (shutdown_tx, handle)
    }
}

/// `client.Complete(job, result.outputData)` payload (§4.7): the execution
/// result serialized into the dynamic `outputData` shape the server
/// expects.
fn exec_result_to_output(result: &ExecResult) -> mush_core::value::ValueMap {
    let Ok(serde_json::Value::Object(map)) = serde_json::to_value(result) else {
        return mush_core::value::ValueMap::new();
    };
    map.into_iter()
        .map(|(k, v)| (k, mush_core::value::Value::from(v)))
        .collect()
}

#[cfg(test)]
#[path = "job_loop_tests.rs"]
mod tests;
