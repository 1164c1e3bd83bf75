// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `RunnerApi` for job-loop and link-registration tests.

use crate::error::ApiError;
use crate::runner_api::RunnerApi;
use crate::types::{LinkDeregisterRequest, LinkRegisterRequest, LinkRegisterResponse};
use async_trait::async_trait;
use mush_core::value::ValueMap;
use mush_core::{Job, JobId, QueueId, RunnerConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One recorded call, for assertions on call order/arguments.
#[derive(Debug, Clone)]
pub enum ApiCall {
    ClaimJob,
    StartJob(String),
    HeartbeatJob(String),
    CompleteJob(String, ValueMap),
    FailJob { job_id: String, reason: String, message: String, retry: bool },
    ReleaseJob(String),
    GetRunnerConfig,
    RegisterLink,
    HeartbeatLink { link_id: String, current_job_id: Option<String> },
    DeregisterLink(String),
}

#[derive(Default)]
struct State {
    calls: Vec<ApiCall>,
    claim_queue: VecDeque<Job>,
    claim_error: Option<String>,
    runner_config: RunnerConfig,
    link_id: String,
    fail_start: bool,
    fail_heartbeat: bool,
    fail_complete: bool,
}

/// Drives a `RunnerApi` caller from a scripted queue of jobs and configs
/// instead of a live server.
#[derive(Clone)]
pub struct FakeRunnerApi {
    inner: Arc<Mutex<State>>,
}

impl Default for FakeRunnerApi {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                link_id: "fake-link".to_string(),
                ..Default::default()
            })),
        }
    }
}

impl FakeRunnerApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().calls.clone()
    }

    /// Queue a job to be returned by the next `claim_job` call.
    pub fn push_job(&self, job: Job) {
        self.inner.lock().claim_queue.push_back(job);
    }

    /// Make the next `claim_job` call fail with a transport error message.
    pub fn fail_next_claim(&self, message: impl Into<String>) {
        self.inner.lock().claim_error = Some(message.into());
    }

    pub fn set_runner_config(&self, config: RunnerConfig) {
        self.inner.lock().runner_config = config;
    }

    pub fn fail_start(&self, fail: bool) {
        self.inner.lock().fail_start = fail;
    }

    pub fn fail_heartbeat(&self, fail: bool) {
        self.inner.lock().fail_heartbeat = fail;
    }

    pub fn fail_complete(&self, fail: bool) {
        self.inner.lock().fail_complete = fail;
    }
}

fn transport_error(message: String) -> ApiError {
    ApiError::Status { status: 0, body: message }
}

#[async_trait]
impl RunnerApi for FakeRunnerApi {
    async fn claim_job(
        &self,
        _habitat: &str,
        _queue: &QueueId,
        _long_poll_seconds: u64,
    ) -> Result<Option<Job>, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::ClaimJob);
        if let Some(message) = inner.claim_error.take() {
            return Err(transport_error(message));
        }
        Ok(inner.claim_queue.pop_front())
    }

    async fn start_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::StartJob(job_id.to_string()));
        if inner.fail_start {
            return Err(transport_error("start failed".to_string()));
        }
        Ok(())
    }

    async fn heartbeat_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::HeartbeatJob(job_id.to_string()));
        if inner.fail_heartbeat {
            return Err(transport_error("heartbeat failed".to_string()));
        }
        Ok(())
    }

    async fn complete_job(&self, job_id: &JobId, output_data: ValueMap) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(ApiCall::CompleteJob(job_id.to_string(), output_data));
        if inner.fail_complete {
            return Err(transport_error("complete failed".to_string()));
        }
        Ok(())
    }

    async fn fail_job(
        &self,
        job_id: &JobId,
        reason: &str,
        message: &str,
        retry: bool,
    ) -> Result<(), ApiError> {
        self.inner.lock().calls.push(ApiCall::FailJob {
            job_id: job_id.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            retry,
        });
        Ok(())
    }

    async fn release_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.inner.lock().calls.push(ApiCall::ReleaseJob(job_id.to_string()));
        Ok(())
    }

    async fn get_runner_config(&self) -> Result<RunnerConfig, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::GetRunnerConfig);
        Ok(inner.runner_config.clone())
    }

    async fn register_link(
        &self,
        _request: LinkRegisterRequest,
    ) -> Result<LinkRegisterResponse, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ApiCall::RegisterLink);
        Ok(LinkRegisterResponse { link_id: inner.link_id.clone() })
    }

    async fn heartbeat_link(&self, link_id: &str, current_job_id: Option<&JobId>) -> Result<(), ApiError> {
        self.inner.lock().calls.push(ApiCall::HeartbeatLink {
            link_id: link_id.to_string(),
            current_job_id: current_job_id.map(JobId::to_string),
        });
        Ok(())
    }

    async fn deregister_link(
        &self,
        link_id: &str,
        _request: LinkDeregisterRequest,
    ) -> Result<(), ApiError> {
        self.inner.lock().calls.push(ApiCall::DeregisterLink(link_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
