// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `reqwest`-backed [`RunnerApi`].

use crate::error::ApiError;
use crate::runner_api::RunnerApi;
use crate::types::{
    CompleteJobRequest, LinkDeregisterRequest, LinkRegisterRequest, LinkRegisterResponse,
};
use async_trait::async_trait;
use mush_core::value::ValueMap;
use mush_core::{Job, JobId, QueueId, RunnerConfig};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Talks to the queue server named by `base_url` (e.g.
/// `https://queue.example.com`).
#[derive(Debug, Clone)]
pub struct HttpRunnerApi {
    client: Client,
    base_url: String,
}

impl HttpRunnerApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Map a non-2xx response to the appropriate `ApiError` variant (§6).
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::CONFLICT => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Conflict(body))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn post_json<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<Resp>().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn post_json_empty<Req: Serialize + Sync>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<(), ApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RunnerApi for HttpRunnerApi {
    async fn claim_job(
        &self,
        habitat: &str,
        queue: &QueueId,
        long_poll_seconds: u64,
    ) -> Result<Option<Job>, ApiError> {
        let response = self
            .client
            .post(self.url("/v1/jobs/claim"))
            .json(&serde_json::json!({
                "habitatId": habitat,
                "queueId": queue.as_str(),
                "longPollSeconds": long_poll_seconds,
            }))
            .send()
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = Self::check_status(response).await?;
        let job: Option<Job> = response.json().await?;
        Ok(job)
    }

    async fn start_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.post_empty(&format!("/v1/jobs/{job_id}/start")).await
    }

    async fn heartbeat_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.post_empty(&format!("/v1/jobs/{job_id}/heartbeat")).await
    }

    async fn complete_job(&self, job_id: &JobId, output_data: ValueMap) -> Result<(), ApiError> {
        let request = CompleteJobRequest { output_data };
        self.post_json_empty(&format!("/v1/jobs/{job_id}/complete"), &request)
            .await
    }

    async fn fail_job(
        &self,
        job_id: &JobId,
        reason: &str,
        message: &str,
        retry: bool,
    ) -> Result<(), ApiError> {
        self.post_json_empty(
            &format!("/v1/jobs/{job_id}/fail"),
            &serde_json::json!({ "reason": reason, "message": message, "retry": retry }),
        )
        .await
    }

    async fn release_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.post_empty(&format!("/v1/jobs/{job_id}/release")).await
    }

    async fn get_runner_config(&self) -> Result<RunnerConfig, ApiError> {
        let response = self.client.get(self.url("/v1/runner-config")).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn register_link(
        &self,
        request: LinkRegisterRequest,
    ) -> Result<LinkRegisterResponse, ApiError> {
        self.post_json("/v1/links/register", &request).await
    }

    async fn heartbeat_link(&self, link_id: &str, current_job_id: Option<&JobId>) -> Result<(), ApiError> {
        self.post_json_empty(
            &format!("/v1/links/{link_id}/heartbeat"),
            &serde_json::json!({ "currentJobId": current_job_id.map(JobId::as_str).unwrap_or("") }),
        )
        .await
    }

    async fn deregister_link(
        &self,
        link_id: &str,
        request: LinkDeregisterRequest,
    ) -> Result<(), ApiError> {
        self.post_json_empty(&format!("/v1/links/{link_id}/deregister"), &request)
            .await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
