// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mush_api::{ApiCall, FakeRunnerApi};
use mush_core::JobId;
use std::time::Duration;

#[tokio::test]
async fn register_stores_the_returned_link_id() {
    let api = Arc::new(FakeRunnerApi::new());
    let registrar = LinkRegistrar::new(api.clone(), "hab", "worker-1", "0.1.0", None);

    let handle = registrar.register().await.unwrap();

    assert_eq!(handle.link_id, "fake-link");
    assert!(api.calls().iter().any(|c| matches!(c, ApiCall::RegisterLink)));
}

#[tokio::test]
async fn run_deregisters_with_job_counts_on_cancel() {
    let api = Arc::new(FakeRunnerApi::new());
    let registrar = LinkRegistrar::new(api.clone(), "hab", "worker-1", "0.1.0", Some("inst-1".to_string()));
    let handle = registrar.register().await.unwrap();

    let state = SharedState::new();
    state.set_current_job(JobId::new("j1"));

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let api_run = api.clone();
    let state_clone = state.clone();
    let task = tokio::spawn(async move {
        registrar
            .run(&handle, state_clone, || 3, || 1, cancel_clone)
            .await;
    });

    cancel.cancel();
    task.await.unwrap();

    let calls = api_run.calls();
    assert!(calls.iter().any(|c| matches!(c, ApiCall::DeregisterLink(id) if id == "fake-link")));
}
