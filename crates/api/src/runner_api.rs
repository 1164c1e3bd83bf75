// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `RunnerApi` trait — the Rust encoding of §6's "Remote API
//! (consumed, not implemented)" operation list.
//!
//! Deliberately thin: one async method per operation, `Result<T, ApiError>`
//! throughout. The job loop (component G) and link registration (component
//! J) are the only callers; neither needs more than this.

use crate::error::ApiError;
use crate::types::{LinkDeregisterRequest, LinkRegisterRequest, LinkRegisterResponse};
use async_trait::async_trait;
use mush_core::value::ValueMap;
use mush_core::{Job, JobId, QueueId, RunnerConfig};

#[async_trait]
pub trait RunnerApi: Send + Sync {
    /// Long-poll claim. `Ok(None)` means the poll window elapsed with no
    /// job available, not an error (§4.7).
    async fn claim_job(
        &self,
        habitat: &str,
        queue: &QueueId,
        long_poll_seconds: u64,
    ) -> Result<Option<Job>, ApiError>;

    async fn start_job(&self, job_id: &JobId) -> Result<(), ApiError>;

    async fn heartbeat_job(&self, job_id: &JobId) -> Result<(), ApiError>;

    async fn complete_job(&self, job_id: &JobId, output_data: ValueMap) -> Result<(), ApiError>;

    async fn fail_job(
        &self,
        job_id: &JobId,
        reason: &str,
        message: &str,
        retry: bool,
    ) -> Result<(), ApiError>;

    async fn release_job(&self, job_id: &JobId) -> Result<(), ApiError>;

    async fn get_runner_config(&self) -> Result<RunnerConfig, ApiError>;

    async fn register_link(
        &self,
        request: LinkRegisterRequest,
    ) -> Result<LinkRegisterResponse, ApiError>;

    async fn heartbeat_link(&self, link_id: &str, current_job_id: Option<&JobId>) -> Result<(), ApiError>;

    async fn deregister_link(
        &self,
        link_id: &str,
        request: LinkDeregisterRequest,
    ) -> Result<(), ApiError>;
}
