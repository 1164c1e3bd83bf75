// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mush_core::value::ValueMap;
use mush_core::{JobId, QueueId};

fn sample_job(id: &str) -> Job {
    Job {
        id: JobId::new(id),
        queue_id: QueueId::new("q1"),
        harness_type: "bash".to_string(),
        rendered_instruction: None,
        input_data: ValueMap::new(),
        execution: None,
        attempt_number: 0,
        priority: 0,
    }
}

#[tokio::test]
async fn claim_job_returns_queued_jobs_in_order() {
    let api = FakeRunnerApi::new();
    api.push_job(sample_job("j1"));
    api.push_job(sample_job("j2"));

    let habitat = "h1";
    let queue = QueueId::new("q1");

    let first = api.claim_job(habitat, &queue, 10).await.unwrap().unwrap();
    assert_eq!(first.id, JobId::new("j1"));

    let second = api.claim_job(habitat, &queue, 10).await.unwrap().unwrap();
    assert_eq!(second.id, JobId::new("j2"));

    assert!(api.claim_job(habitat, &queue, 10).await.unwrap().is_none());
}

#[tokio::test]
async fn claim_job_surfaces_scripted_error_once() {
    let api = FakeRunnerApi::new();
    api.push_job(sample_job("j1"));
    api.fail_next_claim("boom");

    let queue = QueueId::new("q1");
    assert!(api.claim_job("h1", &queue, 10).await.is_err());
    // error is consumed, the queued job is still there afterwards
    let job = api.claim_job("h1", &queue, 10).await.unwrap().unwrap();
    assert_eq!(job.id, JobId::new("j1"));
}

#[tokio::test]
async fn records_calls_in_order() {
    let api = FakeRunnerApi::new();
    let job_id = JobId::new("j1");

    api.start_job(&job_id).await.unwrap();
    api.heartbeat_job(&job_id).await.unwrap();
    api.complete_job(&job_id, ValueMap::new()).await.unwrap();

    let calls = api.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], ApiCall::StartJob(ref id) if id == "j1"));
    assert!(matches!(calls[1], ApiCall::HeartbeatJob(ref id) if id == "j1"));
    assert!(matches!(calls[2], ApiCall::CompleteJob(ref id, _) if id == "j1"));
}

#[tokio::test]
async fn fail_flags_force_errors() {
    let api = FakeRunnerApi::new();
    let job_id = JobId::new("j1");

    api.fail_heartbeat(true);
    assert!(api.heartbeat_job(&job_id).await.is_err());

    api.fail_heartbeat(false);
    assert!(api.heartbeat_job(&job_id).await.is_ok());
}

#[tokio::test]
async fn register_link_returns_configured_id() {
    let api = FakeRunnerApi::new();
    let response = api
        .register_link(LinkRegisterRequest::new(
            None,
            "habitat",
            "host",
            "1.0.0",
            crate::types::ClientMetadata::detect(None),
        ))
        .await
        .unwrap();
    assert_eq!(response.link_id, "fake-link");
}
